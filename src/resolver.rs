//! Command resolution: free text such as "move cat to S tier" to an
//! `(item, tier)` pair.
//!
//! Resolution runs in two stages. The remote stage asks the chat-completion
//! collaborator for a structured command, with bounded retries. When that
//! stage is unavailable the local stage matches a fixed set of phrasings.
//! Both stages resolve the item name with [`find_item_by_name`].

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fmt;

use crate::board::Board;
use crate::collaborator::{strip_code_fence, ChatClient, ChatRequest, CollaboratorError};
use crate::defaults::{COMMAND_MAX_TOKENS, MAX_PARSE_ATTEMPTS, RETRY_DELAY_MS};
use crate::media::Item;

// Order matters: "should go to" must be tried before the bare "go to" form.
static COMMAND_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)move (.+) to (?:the )?(.+?) tier",
        r"(?i)move (.+) into (?:the )?(.+?) tier",
        r"(?i)put (.+) in (?:the )?(.+?) tier",
        r"(?i)(.+) should go to (?:the )?(.+?) tier",
        r"(?i)(.+) go(?:es)? to (?:the )?(.+?) tier",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

/// A move command, as produced by either stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    pub action: String,
    pub item_name: String,
    pub target_tier: String,
}

impl ParsedCommand {
    pub fn move_to(item_name: impl Into<String>, target_tier: impl Into<String>) -> Self {
        ParsedCommand {
            action: "move".to_string(),
            item_name: item_name.into(),
            target_tier: target_tier.into(),
        }
    }
}

/// A command bound to concrete board positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub item_id: String,
    pub tier_index: usize,
    pub tier_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    NotUnderstood,
    ItemNotFound(String),
    TierNotFound(String),
    UnsupportedAction(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotUnderstood => write!(f, "Could not understand command"),
            ResolveError::ItemNotFound(name) => write!(f, "Could not find file: {}", name),
            ResolveError::TierNotFound(label) => write!(f, "Could not find tier: {}", label),
            ResolveError::UnsupportedAction(action) => {
                write!(f, "Only move commands are supported (got \"{}\")", action)
            }
        }
    }
}

impl std::error::Error for ResolveError {}

#[derive(Debug, Clone, Copy)]
enum MatchStrategy {
    ExactLabel,
    PartialLabel,
    ExactName,
    PartialName,
    AllWords,
}

impl MatchStrategy {
    const ORDER: [MatchStrategy; 5] = [
        MatchStrategy::ExactLabel,
        MatchStrategy::PartialLabel,
        MatchStrategy::ExactName,
        MatchStrategy::PartialName,
        MatchStrategy::AllWords,
    ];

    /// `search` is already lowercased.
    fn matches(self, item: &Item, search: &str) -> bool {
        let label = item.label.as_ref().map(|l| l.to_lowercase());
        let name = item.display_name.to_lowercase();
        match self {
            MatchStrategy::ExactLabel => label.is_some_and(|l| l == search),
            MatchStrategy::PartialLabel => label.is_some_and(|l| l.contains(search)),
            MatchStrategy::ExactName => name == search,
            MatchStrategy::PartialName => name.contains(search),
            MatchStrategy::AllWords => search.split_whitespace().all(|word| name.contains(word)),
        }
    }
}

/// Find the item a spoken or typed name refers to.
///
/// Strategies, first hit wins: exact label, label containing the phrase,
/// exact display name, display name containing the phrase, every word of the
/// phrase contained in the display name. Within a strategy the first item in
/// collection order wins. Matching ignores case.
pub fn find_item_by_name<'a>(
    items: impl IntoIterator<Item = &'a Item>,
    search: &str,
) -> Option<&'a Item> {
    let search = search.trim().to_lowercase();
    if search.is_empty() {
        return None;
    }
    let items: Vec<&Item> = items.into_iter().collect();

    for strategy in MatchStrategy::ORDER {
        if let Some(item) = items.iter().copied().find(|item| strategy.matches(item, &search)) {
            debug!("Matched '{}' to '{}' by {:?}", search, item.id, strategy);
            return Some(item);
        }
    }
    debug!("No item matches '{}'", search);
    None
}

/// Bind a parsed command to the board.
pub fn resolve_parsed(board: &Board, command: &ParsedCommand) -> Result<Resolution, ResolveError> {
    if !command.action.eq_ignore_ascii_case("move") {
        return Err(ResolveError::UnsupportedAction(command.action.clone()));
    }
    let item = find_item_by_name(board.items(), &command.item_name)
        .ok_or_else(|| ResolveError::ItemNotFound(command.item_name.clone()))?;
    let tier_index = board
        .tier_index_by_label(&command.target_tier)
        .ok_or_else(|| ResolveError::TierNotFound(command.target_tier.clone()))?;
    Ok(Resolution {
        item_id: item.id.clone(),
        tier_index,
        tier_label: board.tiers()[tier_index].label.clone(),
    })
}

/// Deterministic stage: match the fixed phrasings against the transcript.
///
/// A phrasing only counts when its tier token names an existing tier. When
/// nothing resolves, the most specific failure is reported: a missing item
/// over a missing tier over not understanding the sentence at all.
pub fn resolve_local(board: &Board, transcript: &str) -> Result<Resolution, ResolveError> {
    let transcript = transcript.trim();
    let mut failure = ResolveError::NotUnderstood;

    for pattern in COMMAND_PATTERNS.iter() {
        let Some(captures) = pattern.captures(transcript) else {
            continue;
        };
        let item_name = captures[1].trim();
        let tier_name = captures[2].trim();

        if board.tier_index_by_label(tier_name).is_none() {
            if failure == ResolveError::NotUnderstood {
                failure = ResolveError::TierNotFound(tier_name.to_string());
            }
            continue;
        }

        match resolve_parsed(board, &ParsedCommand::move_to(item_name, tier_name)) {
            Ok(resolution) => return Ok(resolution),
            Err(err @ ResolveError::ItemNotFound(_)) => {
                if !matches!(failure, ResolveError::ItemNotFound(_)) {
                    failure = err;
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(failure)
}

/// Outcome of the remote stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteParse {
    Command(ParsedCommand),
    /// The collaborator answered that the sentence is not a command.
    Unknown,
    /// Every attempt failed; the local stage should take over.
    Unavailable,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteCommand {
    action: Option<String>,
    item_name: Option<String>,
    target_tier: Option<String>,
}

fn decode_command(reply: &str) -> Result<Option<ParsedCommand>, CollaboratorError> {
    let raw: RemoteCommand = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| CollaboratorError::MalformedReply(e.to_string()))?;
    if raw.action.as_deref() == Some("unknown") {
        return Ok(None);
    }
    let non_empty = |field: Option<String>| field.filter(|value| !value.trim().is_empty());
    match (non_empty(raw.action), non_empty(raw.item_name), non_empty(raw.target_tier)) {
        (Some(action), Some(item_name), Some(target_tier)) => Ok(Some(ParsedCommand {
            action,
            item_name,
            target_tier,
        })),
        _ => Err(CollaboratorError::MalformedReply(
            "command is missing action, itemName or targetTier".into(),
        )),
    }
}

/// Prompt describing the board and asking for a JSON move command.
pub fn command_prompt(board: &Board, transcript: &str) -> String {
    let tier_labels: Vec<&str> = board.tiers().iter().map(|t| t.label.as_str()).collect();
    let identifiers: Vec<String> = board
        .items()
        .map(|item| match &item.label {
            Some(label) => format!(
                "\"{}\" (AI-identified as {}, filename: {})",
                label, label, item.display_name
            ),
            None => format!("\"{}\" (filename: {})", item.display_name, item.display_name),
        })
        .collect();

    format!(
        r#"You are a voice command parser for a tier list application. Parse the following voice command and extract the action, item name, and target tier.

Available tier labels: {tiers}
Available files and their identifiers: {files}

Voice command: "{transcript}"

Users can refer to files by their AI-identified labels OR by their original filenames. Prefer the AI-identified labels when available.

Respond with a JSON object in this exact format:
{{
  "action": "move",
  "itemName": "the identifier the user referred to (recognition label or filename)",
  "targetTier": "exact tier label from available tiers"
}}

Common patterns:
- "Move [item] to [tier] tier"
- "Put [item] in [tier] tier"
- "Let's move [item] into [tier] tier"
- "[item] should go to [tier] tier"

If the command is not clear or doesn't match these patterns, respond with: {{"action": "unknown"}}"#,
        tiers = tier_labels.join(", "),
        files = identifiers.join(", "),
        transcript = transcript,
    )
}

/// Remote stage: ask the collaborator, retrying once on failure.
pub async fn parse_remote<C: ChatClient>(client: &C, board: &Board, transcript: &str) -> RemoteParse {
    let request = ChatRequest::user_text(command_prompt(board, transcript), COMMAND_MAX_TOKENS);

    for attempt in 1..=MAX_PARSE_ATTEMPTS {
        let outcome = client
            .complete(&request)
            .await
            .and_then(|reply| decode_command(&reply));
        match outcome {
            Ok(Some(command)) => {
                debug!("Remote parse (attempt {}): {:?}", attempt, command);
                return RemoteParse::Command(command);
            }
            Ok(None) => return RemoteParse::Unknown,
            Err(e) => {
                warn!("Remote command parse failed (attempt {}): {}", attempt, e);
                if attempt < MAX_PARSE_ATTEMPTS {
                    client.pause(RETRY_DELAY_MS).await;
                }
            }
        }
    }
    RemoteParse::Unavailable
}

/// Resolve a transcript, remote stage first, local stage as fallback.
pub async fn resolve<C: ChatClient>(
    client: &C,
    board: &Board,
    transcript: &str,
) -> Result<Resolution, ResolveError> {
    if transcript.trim().is_empty() {
        return Err(ResolveError::NotUnderstood);
    }
    match parse_remote(client, board, transcript).await {
        RemoteParse::Command(command) => resolve_parsed(board, &command),
        RemoteParse::Unknown => Err(ResolveError::NotUnderstood),
        RemoteParse::Unavailable => {
            info!("Falling back to local command matching");
            resolve_local(board, transcript)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Location;
    use crate::media::MediaKind;
    use futures::executor::block_on;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    fn image(id: &str, name: &str) -> Item {
        Item::new(id, name, format!("/uploads/{}", id), MediaKind::Image)
    }

    fn board_with(items: Vec<Item>) -> Board {
        let mut board = Board::with_tier_count(2);
        board.add_to_pool(items);
        board
    }

    /// Replays canned replies, one per request.
    struct Scripted {
        replies: RefCell<VecDeque<Result<String, CollaboratorError>>>,
        calls: RefCell<usize>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, CollaboratorError>>) -> Self {
            Scripted {
                replies: RefCell::new(replies.into()),
                calls: RefCell::new(0),
            }
        }
    }

    impl ChatClient for Scripted {
        async fn complete(&self, _request: &ChatRequest) -> Result<String, CollaboratorError> {
            *self.calls.borrow_mut() += 1;
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or(Err(CollaboratorError::Transport("script exhausted".into())))
        }
    }

    #[test]
    fn moves_labelled_item_to_named_tier() {
        let board = board_with(vec![image("id1", "IMG_0001.png").with_label("cat")]);
        let resolution = resolve_local(&board, "move cat to S tier").unwrap();
        assert_eq!(resolution.item_id, "id1");
        assert_eq!(resolution.tier_index, 0);
        assert_eq!(resolution.tier_label, "S");
    }

    #[test]
    fn unknown_item_is_reported_and_board_untouched() {
        let board = board_with(vec![image("id1", "IMG_0001.png").with_label("cat")]);
        let before = board.clone();
        assert_eq!(
            resolve_local(&board, "move dog to S tier"),
            Err(ResolveError::ItemNotFound("dog".into()))
        );
        assert_eq!(board, before);
    }

    #[test]
    fn unknown_tier_is_reported() {
        let board = board_with(vec![image("id1", "cat.png")]);
        assert_eq!(
            resolve_local(&board, "move cat to Z tier"),
            Err(ResolveError::TierNotFound("Z".into()))
        );
    }

    #[test]
    fn gibberish_is_not_understood() {
        let board = board_with(vec![image("id1", "cat.png")]);
        assert_eq!(resolve_local(&board, "hello there"), Err(ResolveError::NotUnderstood));
        assert_eq!(resolve_local(&board, ""), Err(ResolveError::NotUnderstood));
    }

    #[test]
    fn every_phrasing_is_accepted() {
        let board = board_with(vec![image("id1", "sunset.png")]);
        for phrase in [
            "Move sunset to A tier",
            "move sunset into a tier",
            "put sunset in the A tier",
            "sunset goes to A tier",
            "sunset go to a tier",
            "sunset should go to A tier",
            "let's move sunset to A tier please",
        ] {
            let resolution = resolve_local(&board, phrase)
                .unwrap_or_else(|e| panic!("{:?} failed: {}", phrase, e));
            assert_eq!(resolution.tier_index, 1, "{}", phrase);
        }
    }

    #[test]
    fn should_go_does_not_swallow_the_word_should() {
        let board = board_with(vec![image("id1", "pizza.png")]);
        assert_eq!(
            resolve_local(&board, "pizza should go to S tier").map(|r| r.item_id),
            Ok("id1".to_string())
        );
    }

    #[test]
    fn multi_word_tier_labels_resolve() {
        let mut board = board_with(vec![image("id1", "cat.png")]);
        board.relabel(1, "Top Shelf").unwrap();
        assert_eq!(
            resolve_local(&board, "move cat to top shelf tier").map(|r| r.tier_index),
            Ok(1)
        );
    }

    #[test]
    fn match_strategies_apply_in_priority_order() {
        let items = vec![
            image("a", "my_cat_photo.png"),
            image("b", "cat.png"),
            image("c", "dog.png").with_label("catalog"),
            image("d", "x.png").with_label("cat"),
        ];
        assert_eq!(find_item_by_name(&items, "CAT").map(|i| i.id.as_str()), Some("d"));
        assert_eq!(find_item_by_name(&items, "catal").map(|i| i.id.as_str()), Some("c"));
        assert_eq!(find_item_by_name(&items[..2], "cat.png").map(|i| i.id.as_str()), Some("b"));
        assert_eq!(find_item_by_name(&items[..2], "cat").map(|i| i.id.as_str()), Some("a"));
        assert_eq!(find_item_by_name(&items[..2], "cat my").map(|i| i.id.as_str()), Some("a"));
        assert_eq!(find_item_by_name(&items, "horse"), None);
        assert_eq!(find_item_by_name(&items, "   "), None);
    }

    #[test]
    fn fuzzy_ties_go_to_first_in_collection_order() {
        let mut board = board_with(vec![image("p", "red_cat.png"), image("q", "cat_red.png")]);
        board.place("p", Location::Tier(0)).unwrap();
        // The pool is searched before the tiers.
        assert_eq!(find_item_by_name(board.items(), "red cat").map(|i| i.id.as_str()), Some("q"));
    }

    #[test]
    fn remote_command_is_used_when_available() {
        let board = board_with(vec![image("id1", "cat.png"), image("id2", "dog.png")]);
        let client = Scripted::new(vec![Ok(
            "```json\n{\"action\":\"move\",\"itemName\":\"dog\",\"targetTier\":\"a\"}\n```".into(),
        )]);
        let resolution = block_on(resolve(&client, &board, "dog to the second tier")).unwrap();
        assert_eq!(resolution.item_id, "id2");
        assert_eq!(resolution.tier_index, 1);
        assert_eq!(*client.calls.borrow(), 1);
    }

    #[test]
    fn remote_failure_retries_once_then_falls_back() {
        let board = board_with(vec![image("id1", "cat.png")]);
        let client = Scripted::new(vec![
            Err(CollaboratorError::Timeout(10_000)),
            Ok("not json".into()),
            Ok(r#"{"action":"move","itemName":"nothing","targetTier":"S"}"#.into()),
        ]);
        let resolution = block_on(resolve(&client, &board, "move cat to S tier")).unwrap();
        assert_eq!(resolution.item_id, "id1");
        assert_eq!(*client.calls.borrow(), MAX_PARSE_ATTEMPTS as usize);
    }

    #[test]
    fn remote_unknown_is_final() {
        let board = board_with(vec![image("id1", "cat.png")]);
        let client = Scripted::new(vec![Ok(r#"{"action":"unknown"}"#.into())]);
        assert_eq!(
            block_on(resolve(&client, &board, "move cat to S tier")),
            Err(ResolveError::NotUnderstood)
        );
    }

    #[test]
    fn remote_incomplete_command_counts_as_failure() {
        let board = board_with(vec![image("id1", "cat.png")]);
        let client = Scripted::new(vec![
            Ok(r#"{"action":"move","itemName":"cat"}"#.into()),
            Ok(r#"{"action":"move","itemName":"","targetTier":"S"}"#.into()),
        ]);
        assert_eq!(block_on(parse_remote(&client, &board, "cat up")), RemoteParse::Unavailable);
    }

    #[test]
    fn remote_non_move_action_is_unsupported() {
        let board = board_with(vec![image("id1", "cat.png")]);
        let client = Scripted::new(vec![Ok(
            r#"{"action":"delete","itemName":"cat","targetTier":"S"}"#.into(),
        )]);
        assert_eq!(
            block_on(resolve(&client, &board, "delete cat")),
            Err(ResolveError::UnsupportedAction("delete".into()))
        );
    }

    #[test]
    fn blank_transcript_never_reaches_the_collaborator() {
        let board = board_with(vec![]);
        let client = Scripted::new(vec![]);
        assert_eq!(block_on(resolve(&client, &board, "  ")), Err(ResolveError::NotUnderstood));
        assert_eq!(*client.calls.borrow(), 0);
    }

    #[test]
    fn prompt_lists_tiers_and_identifiers() {
        let board = board_with(vec![
            image("id1", "cat.png").with_label("animal"),
            image("id2", "song.png"),
        ]);
        let prompt = command_prompt(&board, "move animal to S tier");
        assert!(prompt.contains("Available tier labels: S, A"));
        assert!(prompt.contains("\"animal\" (AI-identified as animal, filename: cat.png)"));
        assert!(prompt.contains("\"song.png\" (filename: song.png)"));
        assert!(prompt.contains("Voice command: \"move animal to S tier\""));
    }
}
