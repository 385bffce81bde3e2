/// MutationObserver as a stream of qualifying batches
use crate::error::{ArchiveError, Result};
use crate::sync::MutationBatch;
use futures::channel::mpsc::{UnboundedReceiver, unbounded};
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use wasm_bindgen::prelude::*;
use web_sys::{Element, MutationObserver, MutationObserverInit, MutationRecord, Node};

/// Batches of added subtree nodes accepted by the predicate. The observer is
/// disconnected when this is dropped; call [`observe`] again to restart.
pub struct Observation {
    observer: MutationObserver,
    receiver: UnboundedReceiver<MutationBatch>,
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
}

pub fn observe(root: &Node, predicate: impl Fn(&Element) -> bool + 'static) -> Result<Observation> {
    let (sender, receiver) = unbounded();

    let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
        move |records: js_sys::Array, _observer: MutationObserver| {
            let matched = records
                .iter()
                .map(|record| record.unchecked_into::<MutationRecord>().added_nodes())
                .map(|nodes| {
                    (0..nodes.length())
                        .filter_map(|i| nodes.get(i))
                        .filter_map(|node| node.dyn_into::<Element>().ok())
                        .filter(|element| predicate(element))
                        .count()
                })
                .sum::<usize>();

            if matched > 0 {
                // The receiver is gone only once the observation was dropped
                let _ = sender.unbounded_send(MutationBatch { matched });
            }
        },
    );

    let observer =
        MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(ArchiveError::bridge)?;
    let init = MutationObserverInit::new();
    init.set_child_list(true);
    init.set_subtree(true);
    observer
        .observe_with_options(root, &init)
        .map_err(ArchiveError::bridge)?;

    Ok(Observation {
        observer,
        receiver,
        _callback: callback,
    })
}

impl Stream for Observation {
    type Item = MutationBatch;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<MutationBatch>> {
        self.receiver.poll_next_unpin(cx)
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}
