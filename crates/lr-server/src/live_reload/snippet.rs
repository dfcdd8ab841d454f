//! Reload client injected into served HTML documents.

use std::borrow::Cow;

/// Closing body tag the client is inserted in front of.
///
/// Matched literally and case-sensitively.
const BODY_CLOSE: &[u8] = b"</body>";

/// Browser-side client: subscribes to the push endpoint on the same host and
/// reloads the page when the reload sentinel arrives.
pub const RELOAD_CLIENT: &str = r#"
<script>
    (() => {
        const socket = new WebSocket(`ws://${location.host}/`);
        socket.addEventListener("message", (event) => {
            if (event.data === "reload") {
                console.log("File change detected. Reloading page...");
                window.location.reload();
            }
        });
    })();
</script>
"#;

/// Insert [`RELOAD_CLIENT`] immediately before the first `</body>`.
///
/// Documents without a closing body tag are returned unchanged. Everything
/// outside the insertion point is preserved byte for byte, including
/// non-UTF-8 content.
pub fn inject_reload_client(html: &[u8]) -> Cow<'_, [u8]> {
    let Some(pos) = find(html, BODY_CLOSE) else {
        return Cow::Borrowed(html);
    };

    let mut out = Vec::with_capacity(html.len() + RELOAD_CLIENT.len());
    out.extend_from_slice(&html[..pos]);
    out.extend_from_slice(RELOAD_CLIENT.as_bytes());
    out.extend_from_slice(&html[pos..]);
    Cow::Owned(out)
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
