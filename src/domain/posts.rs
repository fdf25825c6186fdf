use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[day padding:none] [month repr:long] [year], [hour]:[minute]");

/// Number of characters of the body used as a post's display title.
pub const TITLE_CHARS: usize = 15;

/// Short label for a post: the first [`TITLE_CHARS`] characters of its text.
pub fn title_of(text: &str) -> String {
    text.chars().take(TITLE_CHARS).collect()
}

pub fn format_human_date(value: OffsetDateTime) -> String {
    value
        .format(HUMAN_DATE_FORMAT)
        .unwrap_or_else(|_| value.date().to_string())
}
