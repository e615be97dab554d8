//! Redis-backed ranking store.
//!
//! The momentum leaderboard lives in the sorted set [`LEADERBOARD_KEY`] and
//! the sentiment track in the hash [`RATINGS_KEY`]. Single-key increments are
//! atomic on the server; a bump touches three hash fields and runs as one
//! MULTI/EXEC pipeline.

use std::collections::HashMap;
use std::time::Duration;

use r2d2::{CustomizeConnection, Pool};
use redis::{Client, Commands, Connection, ErrorKind, RedisError};
use tracing::debug;

use super::{
    count_field, leaderboard_member, name_field, scale_rating, score_field, sort_ratings,
    LeaderboardEntry, RankingError, RankingStore, RestaurantRating, LEADERBOARD_KEY, RATINGS_KEY,
};
use crate::store::RecordId;

impl From<RedisError> for RankingError {
    fn from(err: RedisError) -> Self {
        if err.is_timeout() {
            RankingError::Timeout(err.to_string())
        } else if err.kind() == ErrorKind::TypeError {
            RankingError::Corrupt(err.to_string())
        } else {
            RankingError::Unavailable(err.to_string())
        }
    }
}

impl From<r2d2::Error> for RankingError {
    fn from(err: r2d2::Error) -> Self {
        RankingError::Unavailable(err.to_string())
    }
}

/// Bounds reads and writes on every connection handed out by the pool.
#[derive(Debug)]
struct IoTimeouts(Duration);

impl CustomizeConnection<Connection, RedisError> for IoTimeouts {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), RedisError> {
        conn.set_read_timeout(Some(self.0))?;
        conn.set_write_timeout(Some(self.0))
    }
}

/// Ranking store over a Redis server, backed by an r2d2 pool of blocking
/// connections.
///
/// Checking out a connection and every read or write are bounded by `timeout`.
pub struct RedisRankingStore {
    pool: Pool<Client>,
}

impl RedisRankingStore {
    /// Parse `url` and build the pool. Connections are opened on first use,
    /// so a server that is down at startup only defers the projections.
    pub fn open(url: &str, timeout: Duration) -> Result<Self, RankingError> {
        let client = Client::open(url)?;
        let pool = Pool::builder()
            .min_idle(Some(0))
            .connection_timeout(timeout)
            .connection_customizer(Box::new(IoTimeouts(timeout)))
            .build_unchecked(client);
        Ok(Self { pool })
    }

    fn with_connection<T>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, RedisError>,
    ) -> Result<T, RankingError> {
        let mut conn = self.pool.get()?;
        op(&mut conn).map_err(|err| {
            debug!(error = %err, "redis command failed");
            err.into()
        })
    }
}

fn parse_int(field: &str, raw: Option<&String>) -> Result<Option<i64>, RankingError> {
    raw.map(|value| {
        value
            .parse::<i64>()
            .map_err(|_| RankingError::Corrupt(format!("{} holds {:?}", field, value)))
    })
    .transpose()
}

/// Ratings of every restaurant with a `"{id}:name"` field in the hash.
fn ratings_from_fields(fields: &HashMap<String, String>) -> Result<Vec<RestaurantRating>, RankingError> {
    let mut ratings = Vec::new();
    for (field, name) in fields {
        let Some(id) = field.strip_suffix(":name") else {
            continue;
        };
        let restaurant_id: RecordId = id
            .parse()
            .map_err(|_| RankingError::Corrupt(format!("bad restaurant id in {:?}", field)))?;
        let score = parse_int("score", fields.get(&score_field(restaurant_id)))?;
        let count = parse_int("count", fields.get(&count_field(restaurant_id)))?;
        ratings.push(RestaurantRating {
            restaurant_id,
            name: name.clone(),
            rating: scale_rating(score, count),
        });
    }
    sort_ratings(&mut ratings);
    Ok(ratings)
}

/// Leaderboard members belonging to `restaurant_id`, under any name.
fn members_of(restaurant_id: RecordId, members: Vec<String>) -> Vec<String> {
    let prefix = format!("{}:", restaurant_id);
    members.into_iter().filter(|m| m.starts_with(&prefix)).collect()
}

impl RankingStore for RedisRankingStore {
    fn bump(&self, restaurant_id: RecordId, name: &str, delta: i64) -> Result<(), RankingError> {
        self.with_connection(|con| {
            redis::pipe()
                .atomic()
                .hincr(RATINGS_KEY, score_field(restaurant_id), delta)
                .ignore()
                .hincr(RATINGS_KEY, count_field(restaurant_id), 1)
                .ignore()
                .hset(RATINGS_KEY, name_field(restaurant_id), name)
                .ignore()
                .query::<()>(con)
        })
    }

    fn increment_leaderboard(
        &self,
        restaurant_id: RecordId,
        name: &str,
        delta: i64,
    ) -> Result<i64, RankingError> {
        let member = leaderboard_member(restaurant_id, name);
        let score: f64 = self.with_connection(|con| con.zincr(LEADERBOARD_KEY, member, delta))?;
        Ok(score.round() as i64)
    }

    fn adjust(&self, restaurant_id: RecordId, delta: i64) -> Result<(), RankingError> {
        self.with_connection(|con| con.hincr(RATINGS_KEY, score_field(restaurant_id), delta))
            .map(|_: i64| ())
    }

    fn top(&self, n: usize) -> Result<Vec<LeaderboardEntry>, RankingError> {
        if n == 0 {
            return Ok(Vec::new());
        }
        let stop = isize::try_from(n - 1).unwrap_or(isize::MAX);
        let rows: Vec<(String, f64)> =
            self.with_connection(|con| con.zrevrange_withscores(LEADERBOARD_KEY, 0, stop))?;
        Ok(rows
            .into_iter()
            .map(|(member, score)| LeaderboardEntry {
                member,
                score: score.round() as i64,
            })
            .collect())
    }

    fn rating(&self, restaurant_id: RecordId) -> Result<f64, RankingError> {
        let (score, count): (Option<String>, Option<String>) = self.with_connection(|con| {
            redis::cmd("HMGET")
                .arg(RATINGS_KEY)
                .arg(score_field(restaurant_id))
                .arg(count_field(restaurant_id))
                .query(con)
        })?;
        Ok(scale_rating(
            parse_int("score", score.as_ref())?,
            parse_int("count", count.as_ref())?,
        ))
    }

    fn all_ratings(&self) -> Result<Vec<RestaurantRating>, RankingError> {
        let fields: HashMap<String, String> =
            self.with_connection(|con| con.hgetall(RATINGS_KEY))?;
        ratings_from_fields(&fields)
    }

    fn remove(&self, restaurant_id: RecordId) -> Result<(), RankingError> {
        self.with_connection(|con| {
            let members: Vec<String> = con.zrange(LEADERBOARD_KEY, 0, -1)?;
            let doomed = members_of(restaurant_id, members);

            let mut pipe = redis::pipe();
            pipe.atomic();
            if !doomed.is_empty() {
                pipe.zrem(LEADERBOARD_KEY, doomed).ignore();
            }
            pipe.hdel(
                RATINGS_KEY,
                vec![
                    score_field(restaurant_id),
                    count_field(restaurant_id),
                    name_field(restaurant_id),
                ],
            )
            .ignore();
            pipe.query::<()>(con)
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    fn hash(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_int_reads_missing_as_none() {
        assert_eq!(parse_int("score", None).unwrap(), None);
        assert_eq!(parse_int("score", Some(&"-4".to_string())).unwrap(), Some(-4));
        assert!(matches!(
            parse_int("count", Some(&"lots".to_string())),
            Err(RankingError::Corrupt(_))
        ));
    }

    #[test]
    fn redis_errors_map_by_kind() {
        let timeout = RedisError::from(io::Error::new(io::ErrorKind::TimedOut, "slow"));
        assert!(matches!(RankingError::from(timeout), RankingError::Timeout(_)));

        let refused = RedisError::from(io::Error::new(io::ErrorKind::ConnectionRefused, "down"));
        assert!(matches!(RankingError::from(refused), RankingError::Unavailable(_)));

        let wrong_type = RedisError::from((ErrorKind::TypeError, "not an integer"));
        assert!(matches!(RankingError::from(wrong_type), RankingError::Corrupt(_)));
    }

    #[test]
    fn ratings_come_from_named_fields() {
        let fields = hash(&[
            ("1:name", "Alpha"),
            ("1:score", "-1"),
            ("1:count", "1"),
            ("2:name", "Beta"),
            ("2:score", "1"),
            ("2:count", "4"),
            // adjusted but never bumped
            ("3:score", "2"),
        ]);
        let ratings = ratings_from_fields(&fields).unwrap();
        let ids: Vec<RecordId> = ratings.iter().map(|r| r.restaurant_id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(ratings[0].name, "Beta");
        assert_eq!(ratings[0].rating, 3.5);
        assert_eq!(ratings[1].rating, 1.0);
    }

    #[test]
    fn corrupt_hash_fields_are_reported() {
        let bad_id = hash(&[("x:name", "Alpha")]);
        assert!(matches!(ratings_from_fields(&bad_id), Err(RankingError::Corrupt(_))));

        let bad_count = hash(&[("1:name", "Alpha"), ("1:count", "many")]);
        assert!(matches!(ratings_from_fields(&bad_count), Err(RankingError::Corrupt(_))));
    }

    #[test]
    fn members_match_on_the_id_prefix() {
        let members = vec![
            "1:Alpha".to_string(),
            "1:Alpha (renamed)".to_string(),
            "11:Kappa".to_string(),
            "21:Phi".to_string(),
        ];
        assert_eq!(
            members_of(1, members),
            vec!["1:Alpha".to_string(), "1:Alpha (renamed)".to_string()]
        );
    }

    #[test]
    fn open_rejects_a_bad_url() {
        assert!(RedisRankingStore::open("not a url", Duration::from_millis(50)).is_err());
    }
}
