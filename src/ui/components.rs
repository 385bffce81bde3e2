/// Small presentational components shared by the panel and the popup

use crate::message::DEFAULT_USERNAME;
use crate::panel::view::Segment;
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct HighlightedTextProps {
    pub segments: Vec<Segment>,
}

#[function_component(HighlightedText)]
pub fn highlighted_text(props: &HighlightedTextProps) -> Html {
    html! {
        <span>
            {for props.segments.iter().map(|segment| {
                if segment.highlighted {
                    html! { <mark>{&segment.text}</mark> }
                } else {
                    html! { {&segment.text} }
                }
            })}
        </span>
    }
}

#[derive(Properties, PartialEq)]
pub struct AvatarProps {
    pub src: String,
    #[prop_or_default]
    pub username: String,
}

/// Profile image, or a lettered circle when none was captured
#[function_component(Avatar)]
pub fn avatar(props: &AvatarProps) -> Html {
    if !props.src.is_empty() {
        return html! { <img src={props.src.clone()} alt={props.username.clone()} /> };
    }

    let initial = props
        .username
        .chars()
        .next()
        .or_else(|| DEFAULT_USERNAME.chars().next())
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default();

    html! {
        <div style="width: 40px; height: 40px; border-radius: 50%; background-color: #1d9bf0; color: white; display: flex; align-items: center; justify-content: center; font-weight: 700; flex-shrink: 0;">
            {initial}
        </div>
    }
}
