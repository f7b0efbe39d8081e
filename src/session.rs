//! The session controller: sole owner of the board.
//!
//! Every user event, network reply and voice result becomes a
//! [`SessionAction`]. Applying one mutates the board synchronously and yields
//! at most one [`Notice`] for the user. Slow work (uploads, recognition,
//! command parsing) happens outside and reports back through an action.

use log::{debug, info};
use std::cell::Cell;
use std::rc::Rc;

use crate::board::{Board, Location};
use crate::media::Item;
use crate::persistence::ImportReport;
use crate::resolver::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    /// CSS modifier used by the toast.
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

/// A message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, message: impl Into<String>) -> Self {
        Notice {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice::new(NoticeLevel::Error, message)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Items accepted by the upload endpoint.
    Uploaded(Vec<Item>),
    Place { item_id: String, destination: Location },
    Remove(String),
    ResizeTiers(usize),
    Relabel { tier_index: usize, label: String },
    /// A resolved move command, from the text box or from voice.
    ApplyResolution(Resolution),
    /// A recognition label finished for an item.
    Annotated { item_id: String, label: String },
    SetRecognition(bool),
    /// Replace the whole board with an imported one.
    Imported { board: Board, report: ImportReport },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    board: Board,
    recognition_enabled: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::new(Board::default())
    }
}

impl Session {
    pub fn new(board: Board) -> Self {
        Session {
            board,
            recognition_enabled: true,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn recognition_enabled(&self) -> bool {
        self.recognition_enabled
    }

    pub fn apply(&mut self, action: SessionAction) -> Option<Notice> {
        match action {
            SessionAction::Uploaded(items) => {
                let offered = items.len();
                let skipped = self.board.add_to_pool(items);
                let added = offered - skipped.len();
                info!("Uploaded {} file(s)", added);
                if skipped.is_empty() {
                    Some(Notice::success(format!("Successfully uploaded {} file(s)!", added)))
                } else {
                    Some(Notice::warning(format!(
                        "Uploaded {} file(s), skipped {} already on the board: {}",
                        added,
                        skipped.len(),
                        skipped.join(", ")
                    )))
                }
            }
            SessionAction::Place {
                item_id,
                destination,
            } => match self.board.place(&item_id, destination) {
                Ok(Location::Tier(_)) if destination == Location::Pool => {
                    Some(Notice::success("Item returned to upload area"))
                }
                Ok(_) => None,
                Err(e) => Some(Notice::warning(e.to_string())),
            },
            SessionAction::Remove(item_id) => self
                .board
                .remove(&item_id)
                .err()
                .map(|e| Notice::warning(e.to_string())),
            SessionAction::ResizeTiers(count) => {
                let returned = self.board.resize_tiers(count);
                (returned > 0).then(|| {
                    Notice::info(format!("{} item(s) moved back to the upload area", returned))
                })
            }
            SessionAction::Relabel { tier_index, label } => self
                .board
                .relabel(tier_index, &label)
                .err()
                .map(|e| Notice::warning(e.to_string())),
            SessionAction::ApplyResolution(resolution) => {
                let destination = Location::Tier(resolution.tier_index);
                match self.board.place(&resolution.item_id, destination) {
                    Ok(_) => {
                        let name = self
                            .board
                            .get(&resolution.item_id)
                            .map(Item::describe)
                            .unwrap_or_else(|| resolution.item_id.clone());
                        Some(Notice::success(format!(
                            "Moved {} to {} tier",
                            name,
                            resolution.tier_label.to_uppercase()
                        )))
                    }
                    Err(e) => Some(Notice::error(e.to_string())),
                }
            }
            SessionAction::Annotated { item_id, label } => {
                if !self.recognition_enabled {
                    debug!("Dropping late label for '{}'", item_id);
                    return None;
                }
                match self.board.set_label(&item_id, Some(label.clone())) {
                    Ok(()) => {
                        let name = self
                            .board
                            .get(&item_id)
                            .map(|item| item.display_name.clone())
                            .unwrap_or(item_id);
                        Some(Notice::success(format!("Recognized \"{}\" as: {}", name, label)))
                    }
                    Err(_) => {
                        debug!("'{}' was removed before its label arrived", item_id);
                        None
                    }
                }
            }
            SessionAction::SetRecognition(enabled) => {
                self.recognition_enabled = enabled;
                if enabled {
                    Some(Notice::success("Image recognition enabled"))
                } else {
                    self.board.clear_labels();
                    Some(Notice::info("Image recognition disabled"))
                }
            }
            SessionAction::Imported { board, report } => {
                self.board = board;
                if report.is_complete() {
                    Some(Notice::success(report.summary()))
                } else {
                    Some(Notice::warning(report.summary()))
                }
            }
        }
    }
}

/// Admits one command at a time. A command offered while another is in
/// flight is refused, not queued.
#[derive(Debug, Clone, Default)]
pub struct CommandGate {
    busy: Rc<Cell<bool>>,
}

impl CommandGate {
    pub fn try_acquire(&self) -> Option<CommandPermit> {
        if self.busy.get() {
            debug!("Command already in flight, dropping");
            return None;
        }
        self.busy.set(true);
        Some(CommandPermit {
            busy: Rc::clone(&self.busy),
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }
}

/// Held for the lifetime of one command; releases the gate on drop.
#[derive(Debug)]
pub struct CommandPermit {
    busy: Rc<Cell<bool>>,
}

impl Drop for CommandPermit {
    fn drop(&mut self) {
        self.busy.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::MediaKind;
    use crate::resolver::resolve_local;

    fn image(id: &str) -> Item {
        Item::new(id, format!("{}.png", id), format!("/uploads/{}", id), MediaKind::Image)
    }

    fn session_with(ids: &[&str]) -> Session {
        let mut session = Session::default();
        session.apply(SessionAction::Uploaded(ids.iter().map(|id| image(id)).collect()));
        session
    }

    #[test]
    fn upload_reports_count_and_duplicates() {
        let mut session = Session::default();
        assert_eq!(
            session.apply(SessionAction::Uploaded(vec![image("a"), image("b")])),
            Some(Notice::success("Successfully uploaded 2 file(s)!"))
        );
        let notice = session.apply(SessionAction::Uploaded(vec![image("a")])).unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(session.board().item_count(), 2);
    }

    #[test]
    fn returning_to_pool_is_announced() {
        let mut session = session_with(&["a"]);
        let to_tier = SessionAction::Place {
            item_id: "a".into(),
            destination: Location::Tier(0),
        };
        assert_eq!(session.apply(to_tier), None);
        assert_eq!(
            session.apply(SessionAction::Place {
                item_id: "a".into(),
                destination: Location::Pool
            }),
            Some(Notice::success("Item returned to upload area"))
        );
    }

    #[test]
    fn failed_operations_warn_and_change_nothing() {
        let mut session = session_with(&["a"]);
        let before = session.clone();
        for action in [
            SessionAction::Remove("ghost".into()),
            SessionAction::Relabel {
                tier_index: 0,
                label: " ".into(),
            },
            SessionAction::Place {
                item_id: "a".into(),
                destination: Location::Tier(42),
            },
        ] {
            let notice = session.apply(action).unwrap();
            assert_eq!(notice.level, NoticeLevel::Warning);
        }
        assert_eq!(session, before);
    }

    #[test]
    fn shrinking_announces_returned_items() {
        let mut session = session_with(&["a"]);
        session.apply(SessionAction::Place {
            item_id: "a".into(),
            destination: Location::Tier(4),
        });
        assert_eq!(
            session.apply(SessionAction::ResizeTiers(3)),
            Some(Notice::info("1 item(s) moved back to the upload area"))
        );
        assert_eq!(session.apply(SessionAction::ResizeTiers(6)), None);
    }

    #[test]
    fn resolved_command_moves_item() {
        let mut session = session_with(&["a"]);
        session.apply(SessionAction::Annotated {
            item_id: "a".into(),
            label: "cat".into(),
        });
        let resolution = resolve_local(session.board(), "move cat to b tier").unwrap();
        assert_eq!(
            session.apply(SessionAction::ApplyResolution(resolution)),
            Some(Notice::success("Moved \"cat\" (a.png) to B tier"))
        );
        assert_eq!(session.board().locate("a"), Some(Location::Tier(2)));
    }

    #[test]
    fn stale_resolution_is_reported() {
        let mut session = session_with(&["a"]);
        let resolution = resolve_local(session.board(), "move a to S tier").unwrap();
        session.apply(SessionAction::Remove("a".into()));
        let notice = session.apply(SessionAction::ApplyResolution(resolution)).unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
    }

    #[test]
    fn disabling_recognition_clears_and_ignores_late_labels() {
        let mut session = session_with(&["a"]);
        session.apply(SessionAction::Annotated {
            item_id: "a".into(),
            label: "cat".into(),
        });
        session.apply(SessionAction::SetRecognition(false));
        assert!(session.board().items().all(|i| i.label.is_none()));

        assert_eq!(
            session.apply(SessionAction::Annotated {
                item_id: "a".into(),
                label: "dog".into()
            }),
            None
        );
        assert!(session.board().get("a").unwrap().label.is_none());

        session.apply(SessionAction::SetRecognition(true));
        assert_eq!(session.board().unlabeled_images().len(), 1);
    }

    #[test]
    fn import_replaces_board() {
        let mut session = session_with(&["a"]);
        let notice = session
            .apply(SessionAction::Imported {
                board: Board::with_tier_count(3),
                report: ImportReport {
                    missing: vec!["x".into()],
                },
            })
            .unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(session.board().tier_count(), 3);
        assert_eq!(session.board().item_count(), 0);
    }

    #[test]
    fn gate_admits_one_command_at_a_time() {
        let gate = CommandGate::default();
        let permit = gate.try_acquire().unwrap();
        assert!(gate.is_busy());
        assert!(gate.clone().try_acquire().is_none());
        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_acquire().is_some());
    }
}
