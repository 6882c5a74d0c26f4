use std::collections::VecDeque;
use std::time::{Duration, Instant};

use arena_types::{MatchKind, ServerMessage};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::battle_manager::{BattleManager, BattleManagerError, DuelPlayer};
use crate::realtime::ConnectionManager;

/// Extra rank points tolerated for every full `WINDOW_STEP` a player has waited.
const WINDOW_GROWTH: i32 = 50;
const WINDOW_STEP: Duration = Duration::from_secs(10);
const MAX_WINDOW: i32 = 1_000;

#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub user_id: Uuid,
    pub display_name: String,
    pub rank_points: i32,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(user_id: Uuid, display_name: String, rank_points: i32) -> Self {
        Self {
            user_id,
            display_name,
            rank_points,
            queued_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RankedPairing {
    pub first: QueuedPlayer,
    pub second: QueuedPlayer,
}

/// FIFO queue of players waiting for a ranked opponent of similar rank.
pub struct RankedQueue {
    queue: RwLock<VecDeque<QueuedPlayer>>,
    base_window: i32,
    queue_timeout: Duration,
}

impl RankedQueue {
    pub fn new(base_window: i32) -> Self {
        Self::new_with_config(base_window, Duration::from_secs(300))
    }

    pub fn new_with_config(base_window: i32, queue_timeout: Duration) -> Self {
        Self {
            queue: RwLock::new(VecDeque::new()),
            base_window,
            queue_timeout,
        }
    }

    /// Allowed rank point gap after waiting `waited`.
    pub fn window_for(&self, waited: Duration) -> i32 {
        let steps = (waited.as_secs() / WINDOW_STEP.as_secs()).min(MAX_WINDOW as u64) as i32;
        self.base_window
            .saturating_add(steps.saturating_mul(WINDOW_GROWTH))
            .min(MAX_WINDOW.max(self.base_window))
    }

    pub async fn add_player(&self, player: QueuedPlayer) -> Result<u32, String> {
        let mut queue = self.queue.write().await;

        if queue.iter().any(|queued| queued.user_id == player.user_id) {
            return Err("Player already in queue".to_string());
        }

        let user_id = player.user_id;
        queue.push_back(player);
        let position = queue.len() as u32;
        info!("Player {} joined the ranked queue at position {}", user_id, position);

        Ok(position)
    }

    pub async fn remove_player(&self, user_id: Uuid) -> bool {
        let mut queue = self.queue.write().await;
        match queue.iter().position(|queued| queued.user_id == user_id) {
            Some(index) => {
                queue.remove(index);
                info!("Player {} left the ranked queue", user_id);
                true
            }
            None => false,
        }
    }

    /// Pair the longest-waiting player with the first compatible opponent.
    pub async fn try_create_match(&self, now: Instant) -> Option<RankedPairing> {
        let mut queue = self.queue.write().await;

        let mut found = None;
        'outer: for i in 0..queue.len() {
            let window = self.window_for(now.saturating_duration_since(queue[i].queued_at));
            for j in (i + 1)..queue.len() {
                if (queue[i].rank_points - queue[j].rank_points).abs() <= window {
                    found = Some((i, j));
                    break 'outer;
                }
            }
        }

        let (i, j) = found?;
        // Remove the later index first so the earlier one stays valid
        let second = queue.remove(j)?;
        let first = queue.remove(i)?;
        info!(
            "Paired {} ({}) with {} ({}) for a ranked battle",
            first.user_id, first.rank_points, second.user_id, second.rank_points
        );
        Some(RankedPairing { first, second })
    }

    /// Put a player back at the front, keeping their original wait time.
    pub async fn requeue_front(&self, player: QueuedPlayer) {
        let mut queue = self.queue.write().await;
        if !queue.iter().any(|queued| queued.user_id == player.user_id) {
            info!("Player {} returned to the front of the ranked queue", player.user_id);
            queue.push_front(player);
        }
    }

    pub async fn position_of(&self, user_id: Uuid) -> Option<u32> {
        let queue = self.queue.read().await;
        queue
            .iter()
            .position(|queued| queued.user_id == user_id)
            .map(|index| index as u32 + 1)
    }

    pub async fn queue_length(&self) -> usize {
        self.queue.read().await.len()
    }

    pub async fn is_player_in_queue(&self, user_id: Uuid) -> bool {
        self.position_of(user_id).await.is_some()
    }

    pub async fn cleanup_expired_players(&self, now: Instant) -> Vec<Uuid> {
        let mut queue = self.queue.write().await;
        let mut expired = Vec::new();

        queue.retain(|player| {
            let keep = now.saturating_duration_since(player.queued_at) <= self.queue_timeout;
            if !keep {
                warn!("Removed expired player {} from the ranked queue", player.user_id);
                expired.push(player.user_id);
            }
            keep
        });
        expired
    }
}

/// Start ranked battles for every compatible pair currently waiting. When a
/// battle cannot start, a player busy in another battle is dropped from the
/// queue and the other one goes back to the front of it.
pub async fn pair_waiting_players(
    queue: &RankedQueue,
    battles: &BattleManager,
    connections: &ConnectionManager,
) -> usize {
    let mut started = 0;
    let mut requeue = Vec::new();

    while let Some(pairing) = queue.try_create_match(Instant::now()).await {
        let result = battles
            .start_duel(
                MatchKind::Ranked,
                DuelPlayer {
                    user_id: pairing.first.user_id,
                    display_name: pairing.first.display_name.clone(),
                },
                DuelPlayer {
                    user_id: pairing.second.user_id,
                    display_name: pairing.second.display_name.clone(),
                },
                Utc::now(),
            )
            .await;

        let err = match result {
            Ok(_) => {
                started += 1;
                continue;
            }
            Err(e) => e,
        };
        warn!(
            "Could not start ranked battle for {} and {}: {}",
            pairing.first.user_id, pairing.second.user_id, err
        );

        let busy_only = matches!(err, BattleManagerError::AlreadyInBattle);
        for player in [pairing.first, pairing.second] {
            if busy_only && !battles.is_in_battle(player.user_id) {
                requeue.push(player);
            } else {
                connections.notify_user(player.user_id, ServerMessage::QueueLeft).await;
            }
        }
    }

    // Requeued after the loop so a failed pair is not retried straight away
    for player in requeue.into_iter().rev() {
        queue.requeue_front(player).await;
    }
    started
}

/// Drop a player from the ranked queue because they started another battle.
pub async fn leave_queue_for_battle(
    queue: &RankedQueue,
    connections: &ConnectionManager,
    user_id: Uuid,
) {
    if queue.remove_player(user_id).await {
        connections.notify_user(user_id, ServerMessage::QueueLeft).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(rank_points: i32) -> QueuedPlayer {
        QueuedPlayer::new(Uuid::new_v4(), "Player".to_string(), rank_points)
    }

    fn queued_at(rank_points: i32, at: Instant) -> QueuedPlayer {
        QueuedPlayer {
            queued_at: at,
            ..player(rank_points)
        }
    }

    #[tokio::test]
    async fn test_basic_queue_operations() {
        let queue = RankedQueue::new(100);
        let entry = player(0);
        let user_id = entry.user_id;

        assert_eq!(queue.add_player(entry).await.unwrap(), 1);
        assert_eq!(queue.queue_length().await, 1);
        assert!(queue.is_player_in_queue(user_id).await);

        assert!(queue.remove_player(user_id).await);
        assert!(!queue.remove_player(user_id).await);
        assert_eq!(queue.queue_length().await, 0);
    }

    #[tokio::test]
    async fn test_prevent_duplicate_queue_entries() {
        let queue = RankedQueue::new(100);
        let entry = player(0);

        assert!(queue.add_player(entry.clone()).await.is_ok());
        assert!(queue.add_player(entry).await.is_err());
        assert_eq!(queue.queue_length().await, 1);
    }

    #[tokio::test]
    async fn test_pairs_players_within_window() {
        let queue = RankedQueue::new(100);
        let now = Instant::now();
        let low = player(100);
        let high = player(900);
        let close = player(180);
        let (low_id, close_id, high_id) = (low.user_id, close.user_id, high.user_id);

        queue.add_player(low).await.unwrap();
        queue.add_player(high).await.unwrap();
        queue.add_player(close).await.unwrap();

        let pairing = queue.try_create_match(now).await.unwrap();
        assert_eq!(pairing.first.user_id, low_id);
        assert_eq!(pairing.second.user_id, close_id);

        // The leftover player has nobody in range
        assert!(queue.try_create_match(now).await.is_none());
        assert_eq!(queue.position_of(high_id).await, Some(1));
    }

    #[tokio::test]
    async fn test_window_widens_with_wait_time() {
        let queue = RankedQueue::new(100);
        assert_eq!(queue.window_for(Duration::from_secs(0)), 100);
        assert_eq!(queue.window_for(Duration::from_secs(25)), 200);
        assert_eq!(queue.window_for(Duration::from_secs(100_000)), MAX_WINDOW);

        let start = Instant::now();
        let now = start + Duration::from_secs(60);
        queue.add_player(queued_at(0, start)).await.unwrap();
        queue.add_player(queued_at(350, now)).await.unwrap();
        assert!(queue.try_create_match(start).await.is_none());

        // 60s of waiting gives the first player a 400 point window
        assert!(queue.try_create_match(now).await.is_some());
    }

    #[tokio::test]
    async fn test_requeue_front_keeps_wait_time() {
        let queue = RankedQueue::new(100);
        let start = Instant::now();
        let newcomer = player(0);
        let returning = queued_at(2_000, start);
        let (newcomer_id, returning_id) = (newcomer.user_id, returning.user_id);

        queue.add_player(newcomer).await.unwrap();
        queue.requeue_front(returning.clone()).await;
        assert_eq!(queue.position_of(returning_id).await, Some(1));
        assert_eq!(queue.position_of(newcomer_id).await, Some(2));

        // Already queued players are not duplicated
        queue.requeue_front(returning).await;
        assert_eq!(queue.queue_length().await, 2);
    }

    #[tokio::test]
    async fn test_cleanup_expired_players() {
        let queue = RankedQueue::new_with_config(100, Duration::from_secs(30));
        let start = Instant::now();
        let now = start + Duration::from_secs(120);
        let stale = queued_at(0, start);
        let stale_id = stale.user_id;

        queue.add_player(stale).await.unwrap();
        queue.add_player(queued_at(5_000, now)).await.unwrap();

        assert_eq!(queue.cleanup_expired_players(now).await, vec![stale_id]);
        assert_eq!(queue.queue_length().await, 1);
    }
}
