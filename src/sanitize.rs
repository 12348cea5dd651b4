use ammonia::Builder;
use std::collections::HashSet;

// Formatting an event description may keep; everything else is stripped
const DESCRIPTION_TAGS: &[&str] = &["b", "i", "em", "strong", "p", "br", "ul", "ol", "li"];

// Dropped together with their contents, not just unwrapped
const DISCARDED_TAGS: &[&str] = &["script", "style", "textarea", "option"];

/// Strip a user-supplied description down to basic formatting. No attributes
/// survive, so no links, handlers or inline styles reach the events table.
pub fn sanitize_event_description(description: &str) -> String {
    Builder::empty()
        .add_tags(DESCRIPTION_TAGS)
        .clean_content_tags(DISCARDED_TAGS.iter().copied().collect::<HashSet<_>>())
        .clean(description)
        .to_string()
}
