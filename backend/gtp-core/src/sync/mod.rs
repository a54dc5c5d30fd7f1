//! Board synchronization between the front-end board and the engine.
//!
//! The front-end board is the source of truth and mutates arbitrarily:
//! setup edits, take-backs, jumps between branches. The engine's notion of
//! the board is append-only and possibly undo-limited. The synchronizer
//! reconciles the two by keeping a private mirror of everything the engine
//! has been told and computing minimal undo/replay sequences against it.
//! The mirror is write-only scratch state and is never exposed outside the
//! subsystem.

use crate::error::gtp::GtpError;
use crate::protocol::{GtpClient, util};

use common::{Color, ErrorLocation, Placement, Point};

use std::panic::Location;
use std::sync::Arc;

use log::{debug, info};

/// Progress callback invoked during long undo/replay runs with the number
/// of placements the mirror currently holds.
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Read-only view of the front-end board the engine must be brought to.
///
/// The rules engine behind it is an opaque collaborator; this subsystem
/// never judges legality itself.
pub trait BoardView {
    fn size(&self) -> u32;

    /// The full placement sequence implied by the board, in play order.
    fn placements(&self) -> &[Placement];

    /// Whether playing a stone of `color` at `point` would capture or be
    /// suicide. Consulted only when a setup edit must be translated into a
    /// played move.
    fn is_capture_or_suicide(&self, point: Point, color: Color) -> bool;
}

/// Engine capabilities the synchronizer depends on, snapshotted at init.
#[derive(Debug, Clone, Copy, Default)]
struct SyncCapabilities {
    undo: bool,
    bulk_undo: bool,
    bulk_play: bool,
    setup: bool,
}

/// What the engine currently believes the board looks like.
struct MirrorBoard {
    size: u32,
    executed: Vec<Placement>,
}

pub struct GtpSynchronizer {
    fill_passes: bool,
    capabilities: SyncCapabilities,
    mirror: Option<MirrorBoard>,
    out_of_sync: bool,
    progress: Option<ProgressCallback>,
}

impl GtpSynchronizer {
    /// `fill_passes` inserts a synthetic pass between consecutive
    /// placements of the same color, for engines that require strict color
    /// alternation.
    pub fn new(fill_passes: bool) -> Self {
        Self {
            fill_passes,
            capabilities: SyncCapabilities::default(),
            mirror: None,
            out_of_sync: false,
            progress: None,
        }
    }

    pub fn set_progress_callback(&mut self, progress: ProgressCallback) {
        self.progress = Some(progress);
    }

    /// Whether the last reconciliation attempt failed mid-sequence. Sticky
    /// until a full [`init`](Self::init) succeeds.
    pub fn is_out_of_sync(&self) -> bool {
        self.out_of_sync
    }

    /// Forget the mirror and sync state. Called on detach and process death.
    pub fn reset(&mut self) {
        self.mirror = None;
        self.out_of_sync = false;
    }

    /// Full reinitialization: snapshot capabilities, clear the engine's
    /// board, replay the whole target sequence.
    ///
    /// # Errors
    ///
    /// Propagates the first command failure; the synchronizer stays out of
    /// sync until a later `init` succeeds.
    pub async fn init(
        &mut self,
        client: &mut GtpClient,
        target: &dyn BoardView,
    ) -> Result<(), GtpError> {
        self.capabilities = SyncCapabilities {
            undo: client.is_supported("undo"),
            bulk_undo: client.is_supported("gg-undo"),
            bulk_play: client.is_supported("gogui-play_sequence"),
            setup: client.is_supported("gogui-setup"),
        };

        self.mirror = None;
        self.out_of_sync = true;

        let size = target.size();
        for command in client.commands_clear_board(size) {
            client.send(&command).await?;
        }

        self.mirror = Some(MirrorBoard {
            size,
            executed: Vec::new(),
        });

        let to_execute = self.compute_target_sequence(target)?;
        self.execute(client, &to_execute).await?;

        self.out_of_sync = false;
        info!(
            "Engine initialized: size {size}, {} placements replayed",
            to_execute.len()
        );
        Ok(())
    }

    /// Reconcile the engine with `target` using a minimal undo/replay
    /// sequence against the mirror.
    ///
    /// # Errors
    ///
    /// [`GtpError::OutOfSync`] immediately when a previous attempt left the
    /// mirror unreliable; the caller decides between a full `init` retry
    /// and giving up. Command failures mid-sequence set the sticky flag and
    /// propagate.
    pub async fn synchronize(
        &mut self,
        client: &mut GtpClient,
        target: &dyn BoardView,
    ) -> Result<(), GtpError> {
        if self.out_of_sync {
            return Err(GtpError::OutOfSync {
                message: String::from("Mirror is unreliable; full initialization required"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let needs_init = match &self.mirror {
            Some(mirror) => mirror.size != target.size(),
            None => true,
        };
        if needs_init {
            debug!("No mirror for this board size, initializing");
            return self.init(client, target).await;
        }

        let to_execute_all = self.compute_target_sequence(target)?;

        let (common, number_undo) = {
            let mirror = self.mirror_ref()?;
            let common = common_prefix_length(&mirror.executed, &to_execute_all);
            (common, mirror.executed.len() - common)
        };

        if number_undo > 0 && !self.capabilities.undo && !self.capabilities.bulk_undo {
            debug!("Undo unsupported ({number_undo} steps needed), reinitializing");
            return self.init(client, target).await;
        }

        debug!(
            "Synchronizing: {number_undo} undo, {} replay",
            to_execute_all.len() - common
        );

        let result = self
            .undo_and_replay(client, number_undo, &to_execute_all[common..])
            .await;
        if result.is_err() {
            self.out_of_sync = true;
        }
        result
    }

    /// Send a move that is about to be played so the engine can reject it
    /// before it is committed to the visible game tree. The mirror is only
    /// updated after the engine accepts.
    pub async fn update_human_move(
        &mut self,
        client: &mut GtpClient,
        mv: Placement,
    ) -> Result<(), GtpError> {
        debug_assert!(!mv.is_setup, "human moves are played, not setup edits");

        if self.out_of_sync {
            return Err(GtpError::OutOfSync {
                message: String::from("Mirror is unreliable; full initialization required"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let needs_pass = {
            let mirror = self.mirror_ref()?;
            self.fill_passes && needs_pass_fill(mirror.executed.last(), &mv)
        };

        if needs_pass {
            let pass = Placement::pass(mv.color.other());
            let command = client.command_play(&pass);
            client.send(&command).await?;
            self.mirror_mut()?.executed.push(pass);
        }

        let command = client.command_play(&mv);
        client.send(&command).await?;
        self.mirror_mut()?.executed.push(mv);
        Ok(())
    }

    /// Record a move the engine just generated. Genmove already advanced
    /// the engine, so only the mirror's bookkeeping changes; no command is
    /// sent.
    pub fn update_after_genmove(&mut self, color: Color, point: Option<Point>) {
        if let Some(mirror) = self.mirror.as_mut() {
            mirror.executed.push(Placement::play(color, point));
        }
    }

    /// Force the sticky flag. Used when the engine demonstrably advanced
    /// but the mirror could not record how (unparsable genmove answer).
    pub(crate) fn mark_out_of_sync(&mut self) {
        self.out_of_sync = true;
    }

    /// Mirror contents, for state assertions in unit tests.
    pub(crate) fn mirror_placements(&self) -> &[Placement] {
        self.mirror
            .as_ref()
            .map(|mirror| mirror.executed.as_slice())
            .unwrap_or(&[])
    }

    async fn undo_and_replay(
        &mut self,
        client: &mut GtpClient,
        number_undo: usize,
        pending: &[Placement],
    ) -> Result<(), GtpError> {
        if number_undo > 0 {
            // gg-undo also covers the single-step case when plain undo is absent
            let bulk = self.capabilities.bulk_undo
                && (number_undo > 1 || !self.capabilities.undo);

            if bulk {
                client.send(&util::command_undo(number_undo, true)).await?;
                let mirror = self.mirror_mut()?;
                let length = mirror.executed.len().saturating_sub(number_undo);
                mirror.executed.truncate(length);
                self.report_progress();
            } else {
                for _ in 0..number_undo {
                    client.send(&util::command_undo(1, false)).await?;
                    self.mirror_mut()?.executed.pop();
                    self.report_progress();
                }
            }
        }

        self.execute(client, pending).await
    }

    /// Send pending placements, batching runs of played moves when the
    /// engine allows it.
    async fn execute(
        &mut self,
        client: &mut GtpClient,
        pending: &[Placement],
    ) -> Result<(), GtpError> {
        let all_moves = pending.iter().all(|placement| !placement.is_setup);

        if pending.len() > 1 && all_moves && self.capabilities.bulk_play {
            client.send(&util::command_play_sequence(pending)).await?;
            self.mirror_mut()?.executed.extend_from_slice(pending);
            self.report_progress();
            return Ok(());
        }

        for placement in pending {
            let command = if placement.is_setup {
                util::command_setup(placement)
            } else {
                client.command_play(placement)
            };
            client.send(&command).await?;
            self.mirror_mut()?.executed.push(*placement);
            self.report_progress();
        }

        Ok(())
    }

    /// Translate the target board's placements into the sequence the engine
    /// can actually execute: setup edits become moves when the engine lacks
    /// a setup primitive, and synthetic passes keep colors alternating when
    /// required.
    ///
    /// # Errors
    ///
    /// [`GtpError::Unsupported`] when a setup edit cannot be faithfully
    /// replayed as a move (stone removal, or a move that would capture or
    /// be suicide).
    fn compute_target_sequence(&self, target: &dyn BoardView) -> Result<Vec<Placement>, GtpError> {
        let mut sequence: Vec<Placement> = Vec::new();

        for placement in target.placements() {
            let translated = if placement.is_setup && !self.capabilities.setup {
                let Some(point) = placement.point else {
                    return Err(GtpError::Protocol {
                        message: String::from("Setup placement without a point"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                };

                if placement.color == Color::Empty {
                    return Err(GtpError::Unsupported {
                        message: format!(
                            "Engine cannot remove the setup stone at {point}"
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                if target.is_capture_or_suicide(point, placement.color) {
                    return Err(GtpError::Unsupported {
                        message: format!(
                            "Setup stone {placement} cannot be replayed as a move"
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                Placement::play(placement.color, Some(point))
            } else {
                *placement
            };

            if self.fill_passes && needs_pass_fill(sequence.last(), &translated) {
                sequence.push(Placement::pass(translated.color.other()));
            }

            sequence.push(translated);
        }

        Ok(sequence)
    }

    #[track_caller]
    fn mirror_ref(&self) -> Result<&MirrorBoard, GtpError> {
        self.mirror.as_ref().ok_or_else(|| GtpError::OutOfSync {
            message: String::from("Engine board was never initialized"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    #[track_caller]
    fn mirror_mut(&mut self) -> Result<&mut MirrorBoard, GtpError> {
        self.mirror.as_mut().ok_or_else(|| GtpError::OutOfSync {
            message: String::from("Engine board was never initialized"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    fn report_progress(&self) {
        if let Some(progress) = &self.progress
            && let Some(mirror) = &self.mirror
        {
            progress(mirror.executed.len());
        }
    }
}

/// Longest position-wise common prefix of the executed and target
/// sequences. Element order is semantically significant (ko, captures), so
/// no reordering is ever considered.
fn common_prefix_length(executed: &[Placement], target: &[Placement]) -> usize {
    executed
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Whether strict alternation requires a synthetic pass between the last
/// executed placement and the next one. Setup edits are not
/// alternation-constrained.
fn needs_pass_fill(last: Option<&Placement>, next: &Placement) -> bool {
    match last {
        Some(previous) => {
            !previous.is_setup
                && !next.is_setup
                && previous.color == next.color
                && next.color != Color::Empty
        }
        None => false,
    }
}
