use crate::models::chat::{ ChatRequest, Content, Message, Part, Turn };

/// Builds the ordered, provider-neutral message list for a request.
///
/// Explicit history on the request takes the place of `prior` entirely. The new
/// user turn always comes last. No validation happens here.
pub fn normalize(request: &ChatRequest, prior: &[Turn]) -> Vec<Message> {
    let mut messages: Vec<Message> = match &request.history {
        Some(explicit) => {
            let mut messages = Vec::with_capacity(explicit.len() + 1);
            messages.extend(explicit.iter().cloned());
            messages
        }
        None => {
            let mut messages = Vec::with_capacity(prior.len() + 1);
            messages.extend(prior.iter().map(Message::from));
            messages
        }
    };

    messages.push(Message::user(user_content(request)));
    messages
}

fn user_content(request: &ChatRequest) -> Content {
    match request.image() {
        Some(url) => Content::Multimodal(vec![Part::text(request.message.as_str()), Part::image(url)]),
        None => Content::Text(request.message.clone()),
    }
}
