//! Recognition annotation: a one-word label for an image item.
//!
//! The collaborator is asked in up to three request formats. The first
//! usable reply wins. When every format fails, a keyword heuristic over the
//! filename supplies the label, so annotation always produces something.

use log::{debug, warn};

use crate::collaborator::{ChatClient, ChatMessage, ChatRequest, ContentPart, ImageUrl, MessageContent};
use crate::defaults::{RECOGNITION_MAX_TOKENS, RECOGNITION_MODEL};

const RECOGNITION_PROMPT: &str = r#"Analyze this image and provide a single word that best describes what it shows. Examples:
- If it's a store/shop: "shop"
- If it's a street/road: "street"
- If it's a person: "person"
- If it's food: "food"
- If it's an animal: "animal"
- If it's a vehicle: "vehicle"
- If it's text/document: "document"
- If it's art/drawing: "art"

Respond with only ONE word, no explanations or additional text."#;

/// Keyword groups checked in order against the lowercased filename.
const FILENAME_KEYWORDS: &[(&str, &[&str])] = &[
    ("shop", &["shop", "store", "market", "mall", "retail"]),
    ("street", &["street", "road", "avenue", "path", "sidewalk"]),
    ("person", &["person", "people", "human", "man", "woman", "child"]),
    ("food", &["food", "pizza", "burger", "cake", "meal", "restaurant"]),
    ("animal", &["cat", "dog", "bird", "fish", "pet", "animal"]),
    ("building", &["building", "house", "home", "office", "tower"]),
    ("nature", &["tree", "forest", "mountain", "beach", "sky", "nature"]),
    ("vehicle", &["car", "truck", "bike", "vehicle", "auto"]),
    ("document", &["document", "text", "paper", "note"]),
    ("art", &["art", "paint", "draw", "sketch", "design"]),
];

const FALLBACK_LABELS: [&str; 4] = ["image", "photo", "picture", "item"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelSource {
    Collaborator,
    Filename,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub label: String,
    pub source: LabelSource,
}

/// Requests to try, most informative first.
///
/// With an image payload: a multimodal message, then the payload inlined as
/// text. The filename-only request is always last.
pub fn recognition_requests(filename: &str, image_data_url: Option<&str>) -> Vec<ChatRequest> {
    let mut requests = Vec::with_capacity(3);
    if let Some(data_url) = image_data_url {
        requests.push(ChatRequest {
            model: Some(RECOGNITION_MODEL.to_string()),
            messages: vec![ChatMessage::user(MessageContent::Parts(vec![
                ContentPart::Text {
                    text: RECOGNITION_PROMPT.to_string(),
                },
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_url.to_string(),
                    },
                },
            ]))],
            max_tokens: RECOGNITION_MAX_TOKENS,
            temperature: 0.1,
        });
        requests.push(
            ChatRequest::user_text(
                format!("{}\n\nImage data: {}", RECOGNITION_PROMPT, data_url),
                RECOGNITION_MAX_TOKENS,
            )
            .with_model(RECOGNITION_MODEL),
        );
    }
    requests.push(ChatRequest::user_text(
        format!(
            "Analyze the filename \"{}\" and provide a single word that best describes what type of image it might be. \
             Examples: shop, street, person, food, animal, building, nature, vehicle, document, art. Respond with only ONE word.",
            filename
        ),
        RECOGNITION_MAX_TOKENS,
    ));
    requests
}

/// Collapse a free-text reply to one lowercase word.
pub fn normalize_label(reply: &str) -> Option<String> {
    let word = reply
        .split_whitespace()
        .next()?
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    if word.is_empty() {
        None
    } else {
        Some(word)
    }
}

/// Keyword heuristic over the filename. Always returns a label.
pub fn filename_label(filename: &str) -> String {
    let name = filename.to_lowercase();
    for (label, keywords) in FILENAME_KEYWORDS {
        if keywords.iter().any(|keyword| name.contains(keyword)) {
            return label.to_string();
        }
    }
    let slot = name.bytes().map(usize::from).sum::<usize>() % FALLBACK_LABELS.len();
    FALLBACK_LABELS[slot].to_string()
}

/// Label an image, trying the collaborator first.
pub async fn annotate<C: ChatClient>(
    client: &C,
    filename: &str,
    image_data_url: Option<&str>,
) -> Annotation {
    for (format, request) in recognition_requests(filename, image_data_url)
        .iter()
        .enumerate()
    {
        match client.complete(request).await {
            Ok(reply) => match normalize_label(&reply) {
                Some(label) => {
                    debug!("Recognized {} as '{}' (format {})", filename, label, format + 1);
                    return Annotation {
                        label,
                        source: LabelSource::Collaborator,
                    };
                }
                None => debug!("Format {} gave an empty reply for {}", format + 1, filename),
            },
            Err(e) => debug!("Format {} failed for {}: {}", format + 1, filename, e),
        }
    }
    warn!("All recognition formats failed for {}, using filename", filename);
    Annotation {
        label: filename_label(filename),
        source: LabelSource::Filename,
    }
}
