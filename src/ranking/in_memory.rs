use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use super::{
    leaderboard_member, scale_rating, sort_ratings, LeaderboardEntry, RankingError, RankingStore,
    RestaurantRating,
};
use crate::store::RecordId;

/// Sentiment-track fields of one restaurant. `None` mirrors an absent hash field.
#[derive(Debug, Default)]
struct Tally {
    score: Option<i64>,
    count: Option<i64>,
    name: Option<String>,
}

/// Sorted set with a member index, so updates are O(log n).
#[derive(Debug, Default)]
struct Leaderboard {
    ordered: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
}

impl Leaderboard {
    fn increment(&mut self, member: String, delta: i64) -> i64 {
        let previous = self.scores.get(&member).copied();
        if let Some(score) = previous {
            self.ordered.remove(&(score, member.clone()));
        }
        let score = previous.unwrap_or(0) + delta;
        self.ordered.insert((score, member.clone()));
        self.scores.insert(member, score);
        score
    }

    fn remove_prefixed(&mut self, prefix: &str) {
        let doomed: Vec<(String, i64)> = self
            .scores
            .iter()
            .filter(|(member, _)| member.starts_with(prefix))
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        for (member, score) in doomed {
            self.scores.remove(&member);
            self.ordered.remove(&(score, member));
        }
    }
}

/// In-memory ranking store.
///
/// The sentiment track takes a per-restaurant lock: the outer map lock is
/// held only long enough to find or create the restaurant's tally, so bumps
/// to different restaurants never wait on each other.
///
/// Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryRankingStore {
    tallies: Arc<RwLock<HashMap<RecordId, Arc<Mutex<Tally>>>>>,
    leaderboard: Arc<Mutex<Leaderboard>>,
    offline: Arc<AtomicBool>,
}

fn poisoned<T>(_: T) -> RankingError {
    RankingError::Unavailable("lock poisoned".into())
}

impl InMemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with [`RankingError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), RankingError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RankingError::Unavailable("ranking store offline".into()));
        }
        Ok(())
    }

    fn tally(&self, restaurant_id: RecordId) -> Result<Arc<Mutex<Tally>>, RankingError> {
        if let Some(tally) = self.tallies.read().map_err(poisoned)?.get(&restaurant_id) {
            return Ok(Arc::clone(tally));
        }
        let mut tallies = self.tallies.write().map_err(poisoned)?;
        Ok(Arc::clone(tallies.entry(restaurant_id).or_default()))
    }

    fn leaderboard(&self) -> Result<MutexGuard<'_, Leaderboard>, RankingError> {
        self.ensure_online()?;
        self.leaderboard.lock().map_err(poisoned)
    }
}

impl RankingStore for InMemoryRankingStore {
    fn bump(&self, restaurant_id: RecordId, name: &str, delta: i64) -> Result<(), RankingError> {
        self.ensure_online()?;
        let tally = self.tally(restaurant_id)?;
        let mut tally = tally.lock().map_err(poisoned)?;
        tally.score = Some(tally.score.unwrap_or(0) + delta);
        tally.count = Some(tally.count.unwrap_or(0) + 1);
        tally.name = Some(name.to_string());
        Ok(())
    }

    fn increment_leaderboard(
        &self,
        restaurant_id: RecordId,
        name: &str,
        delta: i64,
    ) -> Result<i64, RankingError> {
        let member = leaderboard_member(restaurant_id, name);
        Ok(self.leaderboard()?.increment(member, delta))
    }

    fn adjust(&self, restaurant_id: RecordId, delta: i64) -> Result<(), RankingError> {
        self.ensure_online()?;
        let tally = self.tally(restaurant_id)?;
        let mut tally = tally.lock().map_err(poisoned)?;
        tally.score = Some(tally.score.unwrap_or(0) + delta);
        Ok(())
    }

    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, RankingError> {
        let leaderboard = self.leaderboard()?;
        Ok(leaderboard
            .ordered
            .iter()
            .rev()
            .take(n)
            .map(|(score, member)| LeaderboardEntry {
                member: member.clone(),
                score: *score,
            })
            .collect())
    }

    fn rating(&self, restaurant_id: RecordId) -> Result<f64, RankingError> {
        self.ensure_online()?;
        let tally = self
            .tallies
            .read()
            .map_err(poisoned)?
            .get(&restaurant_id)
            .cloned();
        match tally {
            Some(tally) => {
                let tally = tally.lock().map_err(poisoned)?;
                Ok(scale_rating(tally.score, tally.count))
            }
            None => Ok(scale_rating(None, None)),
        }
    }

    fn all_ratings(&self) -> Result<Vec<RestaurantRating>, RankingError> {
        self.ensure_online()?;
        let tallies: Vec<(RecordId, Arc<Mutex<Tally>>)> = self
            .tallies
            .read()
            .map_err(poisoned)?
            .iter()
            .map(|(id, tally)| (*id, Arc::clone(tally)))
            .collect();

        let mut ratings = Vec::with_capacity(tallies.len());
        for (restaurant_id, tally) in tallies {
            let tally = tally.lock().map_err(poisoned)?;
            // only restaurants that have been bumped carry a name
            if let Some(name) = &tally.name {
                ratings.push(RestaurantRating {
                    restaurant_id,
                    name: name.clone(),
                    rating: scale_rating(tally.score, tally.count),
                });
            }
        }
        sort_ratings(&mut ratings);
        Ok(ratings)
    }

    fn remove(&self, restaurant_id: RecordId) -> Result<(), RankingError> {
        self.leaderboard()?
            .remove_prefixed(&format!("{}:", restaurant_id));
        self.tallies.write().map_err(poisoned)?.remove(&restaurant_id);
        Ok(())
    }
}
