//! Standalone printable page for a board.

use crate::board::Board;
use crate::media::Item;

/// Escape text for use in HTML content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Resolve `url` against `origin` unless it already carries a scheme.
/// The print page loads from a `blob:` URL, which cannot serve as a base.
pub fn absolute_url(origin: &str, url: &str) -> String {
    let has_scheme = url.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
    });
    if has_scheme || url.starts_with("//") {
        return url.to_string();
    }
    let origin = origin.trim_end_matches('/');
    match url.strip_prefix('/') {
        Some(path) => format!("{}/{}", origin, path),
        None => format!("{}/{}", origin, url),
    }
}

fn render_item(item: &Item, origin: &str) -> String {
    if item.kind.is_audio() {
        let short: String = item.display_name.chars().take(10).collect();
        format!(
            r#"<div class="audio"><div class="note">&#9835;</div><div class="name">{}</div></div>"#,
            escape_html(&short)
        )
    } else {
        format!(
            r#"<img src="{}" alt="{}">"#,
            escape_html(&absolute_url(origin, &item.media_url)),
            escape_html(&item.display_name)
        )
    }
}

/// Render every tier as a labelled row. The pool is left out.
///
/// Relative media URLs are resolved against `origin`. The page prints
/// itself once its images have loaded.
pub fn printable_html(board: &Board, generated_at: &str, origin: &str) -> String {
    let rows: String = board
        .tiers()
        .iter()
        .map(|tier| {
            let items: String = tier.items.iter().map(|item| render_item(item, origin)).collect();
            format!(
                r#"<div class="tier"><div class="label">{}</div><div class="items">{}</div></div>"#,
                escape_html(&tier.label),
                items
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Tier List - {stamp}</title>
<style>
body {{ font-family: Arial, sans-serif; margin: 20px; color: #333; }}
.header {{ text-align: center; margin-bottom: 30px; border-bottom: 2px solid #333; padding-bottom: 20px; }}
.tier {{ display: flex; min-height: 80px; margin-bottom: 20px; border: 2px solid #333; border-radius: 8px; page-break-inside: avoid; }}
.label {{ background: #333; color: #fff; padding: 20px; font-size: 24px; font-weight: bold; min-width: 80px; text-align: center; }}
.items {{ flex: 1; padding: 10px; display: flex; flex-wrap: wrap; gap: 10px; align-items: center; }}
.items img {{ height: 60px; width: auto; object-fit: contain; border: 1px solid #ccc; }}
.audio {{ width: 60px; height: 60px; border: 1px solid #ccc; display: flex; flex-direction: column; align-items: center; justify-content: center; }}
.audio .note {{ font-size: 20px; }}
.audio .name {{ font-size: 8px; overflow: hidden; }}
@media print {{ body {{ margin: 0; }} }}
</style>
</head>
<body onload="setTimeout(function () {{ window.print(); }}, 500)">
<div class="header"><h1>Tier List</h1><p>Generated on {stamp}</p></div>
{rows}
</body>
</html>
"#,
        stamp = escape_html(generated_at),
        rows = rows
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Location;
    use crate::media::MediaKind;

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<b>"Tom" & 'Jerry'</b>"#), "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;");
    }

    #[test]
    fn renders_tiers_in_order_with_escaped_content() {
        let mut board = Board::with_tier_count(2);
        board.relabel(0, "<S>").unwrap();
        board.add_to_pool([
            Item::new("a", "a\"b.png", "/uploads/a", MediaKind::Image),
            Item::new("m", "a_very_long_song.mp3", "/uploads/m", MediaKind::Audio),
            Item::new("p", "pool.png", "/uploads/p", MediaKind::Image),
        ]);
        board.place("a", Location::Tier(0)).unwrap();
        board.place("m", Location::Tier(1)).unwrap();

        let html = printable_html(&board, "2024-05-01 12:00", "https://tiers.example");
        assert!(html.contains("<title>Tier List - 2024-05-01 12:00</title>"));
        assert!(html.contains(r#"<div class="label">&lt;S&gt;</div>"#));
        assert!(html.contains(r#"<img src="https://tiers.example/uploads/a" alt="a&quot;b.png">"#));
        assert!(html.contains(r#"<div class="name">a_very_lon</div>"#));
        assert!(!html.contains("pool.png"));
        let s = html.find("&lt;S&gt;").unwrap();
        let a = html.find(r#"<div class="label">A</div>"#).unwrap();
        assert!(s < a);
    }

    #[test]
    fn image_sources_are_absolute() {
        assert_eq!(
            absolute_url("https://host:8080", "/uploads/a.png"),
            "https://host:8080/uploads/a.png"
        );
        assert_eq!(
            absolute_url("https://host/", "uploads/a.png"),
            "https://host/uploads/a.png"
        );
        for kept in [
            "https://cdn.example/a.png",
            "data:image/png;base64,AAAA",
            "//cdn.example/a.png",
        ] {
            assert_eq!(absolute_url("https://host", kept), kept);
        }

        let mut board = Board::with_tier_count(1);
        board.add_to_pool([
            Item::new("a", "a.png", "/uploads/a", MediaKind::Image),
            Item::new("b", "b.png", "/uploads/b", MediaKind::Image),
        ]);
        board.place("a", Location::Tier(0)).unwrap();
        board.place("b", Location::Tier(0)).unwrap();

        let html = printable_html(&board, "now", "http://localhost:3000");
        assert!(html.contains(r#"src="http://localhost:3000/uploads/a""#));
        assert!(html.contains(r#"src="http://localhost:3000/uploads/b""#));
        assert!(!html.contains(r#"src="/"#));
    }
}
