use crate::models::message::Message;

/// Words that send a request to the image node. A plain substring test, so
/// "created_at" or "photography" match too.
pub const IMAGE_KEYWORDS: [&str; 9] = [
    "generate", "create", "draw", "modify", "edit", "style", "design", "image", "photo",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Route {
    Image,
    Agent,
}

/// Pick the node that handles a request
pub fn route(text: &str, has_image: bool) -> Route {
    if has_image {
        return Route::Image;
    }
    let lowered = text.to_lowercase();
    if IMAGE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        Route::Image
    } else {
        Route::Agent
    }
}

/// Route on the user's own words and whether an image is attached. Text from an
/// uploaded document never takes part.
pub fn route_message(message: &Message) -> Route {
    route(message.last_text().unwrap_or_default(), message.has_image())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_route_to_image() {
        for keyword in IMAGE_KEYWORDS {
            assert_eq!(route(&format!("please {} something", keyword), false), Route::Image);
        }
        assert_eq!(route("DRAW a castle at night", false), Route::Image);
        assert_eq!(route("Show me a Photograph", false), Route::Image);
    }

    #[test]
    fn test_route_is_image_iff_keyword() {
        let samples = [
            "how many customers do we have?",
            "list tables",
            "export orders to excel",
            "hello",
            "",
            "which product sold best in March",
            "when was the order created",
            "edit my last query",
        ];
        for text in samples {
            let lowered = text.to_lowercase();
            let expected = if IMAGE_KEYWORDS.iter().any(|k| lowered.contains(k)) {
                Route::Image
            } else {
                Route::Agent
            };
            assert_eq!(route(text, false), expected, "text: {:?}", text);
        }
        assert_eq!(route("list tables", false), Route::Agent);
        assert_eq!(route("when was the order created", false), Route::Image);
    }

    #[test]
    fn test_attached_image_forces_image_route() {
        assert_eq!(route("how many rows?", true), Route::Image);
        assert_eq!(route("", true), Route::Image);
    }

    #[test]
    fn test_route_message() {
        let plain = Message::user().with_text("count the orders");
        assert_eq!(route_message(&plain), Route::Agent);

        let with_image = Message::user()
            .with_text("what is this?")
            .with_image("aGVsbG8=", "image/png");
        assert_eq!(route_message(&with_image), Route::Image);
    }

    #[test]
    fn test_document_text_does_not_route() {
        let message = Message::user()
            .with_text("PDF Content from 'q3.pdf':\n\nCreated by the design team.\n\n---\n\nUser Question:")
            .with_text("what were the total profits in Q3?");
        assert_eq!(route_message(&message), Route::Agent);

        let asks_for_image = Message::user()
            .with_text("PDF Content from 'q3.pdf':\n\nquarterly numbers\n\n---\n\nUser Question:")
            .with_text("draw a chart of this");
        assert_eq!(route_message(&asks_for_image), Route::Image);
    }
}
