use html_escape::decode_html_entities;

/// Elements whose bodies are dropped together with their tags.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// What to do with markup starting at a `<`.
enum Markup {
    /// Not markup (e.g. `a < b`): keep the `<` as text.
    Literal,
    /// Skip this many bytes.
    Skip(usize),
    /// Markup that never terminates: drop everything from here on.
    Unterminated,
}

/// Strips HTML markup from a string, returning plain text.
///
/// Deterministic single-pass sanitizer used for titles, summaries and content:
///
/// - Tags (`<b>`, `</p>`, `<img src="a>b">`) are removed; quoted attribute
///   values may contain `>`.
/// - Comments (`<!-- ... -->`), doctypes and processing instructions are removed.
/// - `<script>` and `<style>` are removed together with their bodies.
/// - A `<` not followed by a letter, `/`, `!` or `?` is literal text (`a < b`).
/// - Markup that is never closed (`Hello <b`) is dropped up to the end of input.
/// - Character references (`&amp;`, `&#39;`) in text are decoded.
/// - The result is trimmed. Adjacent elements are not separated by spaces.
///
/// # Examples
///
/// ```
/// use feeder::util::strip_html_tags;
///
/// assert_eq!(strip_html_tags("<p>Hello <b>world</b></p>"), "Hello world");
/// assert_eq!(strip_html_tags("Fish &amp; chips"), "Fish & chips");
/// assert_eq!(strip_html_tags("1 < 2"), "1 < 2");
/// ```
pub fn strip_html_tags(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }

    let mut text = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        push_decoded(&mut text, &rest[..open]);
        let markup = &rest[open..];
        match classify_markup(markup) {
            Markup::Literal => {
                text.push('<');
                rest = &markup[1..];
            }
            Markup::Skip(len) => rest = &markup[len..],
            Markup::Unterminated => rest = "",
        }
    }
    push_decoded(&mut text, rest);

    text.trim().to_string()
}

/// Counts whitespace-separated words.
///
/// ```
/// use feeder::util::count_words;
///
/// assert_eq!(count_words("Hello world"), 2);
/// assert_eq!(count_words("   "), 0);
/// ```
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

fn push_decoded(out: &mut String, segment: &str) {
    if !segment.is_empty() {
        out.push_str(&decode_html_entities(segment));
    }
}

/// Classifies markup starting at `s`, which begins with `<`.
fn classify_markup(s: &str) -> Markup {
    let bytes = s.as_bytes();
    let Some(&next) = bytes.get(1) else {
        return Markup::Literal;
    };

    if s.starts_with("<!--") {
        return match s[4..].find("-->") {
            Some(end) => Markup::Skip(4 + end + 3),
            None => Markup::Unterminated,
        };
    }

    if !(next.is_ascii_alphabetic() || next == b'/' || next == b'!' || next == b'?') {
        return Markup::Literal;
    }

    let Some(tag_len) = find_tag_end(s) else {
        return Markup::Unterminated;
    };

    let name: String = s[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();

    if !RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
        return Markup::Skip(tag_len);
    }

    // Skip the element body up to and including its closing tag.
    let body = &s[tag_len..];
    let closing = format!("</{}", name);
    match body.to_ascii_lowercase().find(&closing) {
        Some(close_at) => match find_tag_end(&body[close_at..]) {
            Some(close_len) => Markup::Skip(tag_len + close_at + close_len),
            None => Markup::Unterminated,
        },
        None => Markup::Unterminated,
    }
}

/// Returns the byte length of the tag at the start of `s`, honoring quoted
/// attribute values, or `None` when the tag never closes.
fn find_tag_end(s: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (idx, &b) in s.as_bytes().iter().enumerate().skip(1) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(idx + 1),
            None => {}
        }
    }
    None
}
