use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Tweet document as stored.
///
/// Every nested field is optional here; which of them must be present depends
/// on the shape of the record and is decided by [`normalize`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTweet {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub id_str: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub truncated: bool,
    #[serde(default)]
    pub entities: Option<Entities>,
    #[serde(default)]
    pub extended_tweet: Option<ExtendedTweet>,
    #[serde(default)]
    pub retweeted_status: Option<Box<RawTweet>>,
    #[serde(default)]
    pub retweeted: bool,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub created_at: Option<CreatedAt>,
    /// epoch milliseconds as a decimal string
    #[serde(default)]
    pub timestamp_ms: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Entities {
    #[serde(default)]
    pub hashtags: Vec<HashtagEntity>,
    #[serde(default)]
    pub urls: Vec<serde_json::Value>,
    #[serde(default)]
    pub user_mentions: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashtagEntity {
    pub text: String,
    /// `[start, end]` offsets of `#text` in the tweet text
    #[serde(default)]
    pub indices: Option<[u32; 2]>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendedTweet {
    #[serde(default)]
    pub full_text: Option<String>,
    #[serde(default)]
    pub entities: Option<Entities>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub id_str: Option<String>,
}

/// `created_at` as stored: Twitter's date string, RFC 3339, or epoch seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CreatedAt {
    Epoch(i64),
    Text(String),
}

/// Entity list of a tweet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Urls,
    UserMentions,
}

impl Entities {
    #[inline]
    pub fn has(&self, kind: EntityKind) -> bool {
        match kind {
            EntityKind::Urls => !self.urls.is_empty(),
            EntityKind::UserMentions => !self.user_mentions.is_empty(),
        }
    }
}

/// Which branch resolved a tweet's canonical text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TweetShape {
    /// own `text` / `entities`
    Plain,
    /// `extended_tweet.full_text` / `.entities`
    Extended,
    /// `retweeted_status.text` / `.entities`
    Retweet,
    /// `retweeted_status.extended_tweet.full_text` / `.entities`
    RetweetOfTruncated,
}

/// A tweet after schema resolution. All feature code works on this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalTweet {
    pub id: String,
    pub shape: TweetShape,
    pub text: String,
    pub hashtags: Vec<HashtagEntity>,
    pub author_id: String,
    pub is_retweet: bool,
    pub has_urls: bool,
    pub has_mentions: bool,
    /// epoch seconds
    pub created_at: i64,
}

impl CanonicalTweet {
    /// true if `hashtag` is one of this tweet's hashtags (exact, case-sensitive)
    #[inline]
    pub fn contains_hashtag(&self, hashtag: &str) -> bool {
        self.hashtags.iter().any(|h| h.text == hashtag)
    }

    /// true if the tweet carries a hashtag other than `hashtag`
    #[inline]
    pub fn has_other_hashtag(&self, hashtag: &str) -> bool {
        self.hashtags.iter().any(|h| h.text != hashtag)
    }
}

const TWITTER_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

impl RawTweet {
    /// `id_str`, or `id` rendered, or `"<unknown>"` for error reporting
    pub fn display_id(&self) -> String {
        self.id_str
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
            .unwrap_or_else(|| "<unknown>".to_string())
    }

    fn tweet_id(&self) -> Result<String, SchemaError> {
        self.id_str
            .clone()
            .or_else(|| self.id.map(|id| id.to_string()))
            .ok_or_else(|| SchemaError::missing("<unknown>", "id"))
    }

    /// The shape deciding canonical text, in fixed precedence order.
    pub fn shape(&self) -> TweetShape {
        if self.extended_tweet.is_some() {
            TweetShape::Extended
        } else if let Some(rt) = &self.retweeted_status {
            if rt.truncated {
                TweetShape::RetweetOfTruncated
            } else {
                TweetShape::Retweet
            }
        } else {
            TweetShape::Plain
        }
    }

    /// Resolve canonical `(text, entities)` for this record.
    fn resolve_text<'a>(&'a self, id: &str, shape: TweetShape) -> Result<(&'a str, &'a Entities), SchemaError> {
        match shape {
            TweetShape::Extended => {
                let ext = self
                    .extended_tweet
                    .as_ref()
                    .ok_or_else(|| SchemaError::missing(id, "extended_tweet"))?;
                let text = ext
                    .full_text
                    .as_deref()
                    .ok_or_else(|| SchemaError::missing(id, "extended_tweet.full_text"))?;
                let entities = ext
                    .entities
                    .as_ref()
                    .ok_or_else(|| SchemaError::missing(id, "extended_tweet.entities"))?;
                Ok((text, entities))
            }
            TweetShape::Retweet => {
                let rt = self
                    .retweeted_status
                    .as_deref()
                    .ok_or_else(|| SchemaError::missing(id, "retweeted_status"))?;
                let text = rt
                    .text
                    .as_deref()
                    .ok_or_else(|| SchemaError::missing(id, "retweeted_status.text"))?;
                let entities = rt
                    .entities
                    .as_ref()
                    .ok_or_else(|| SchemaError::missing(id, "retweeted_status.entities"))?;
                Ok((text, entities))
            }
            TweetShape::RetweetOfTruncated => {
                let ext = self
                    .retweeted_status
                    .as_deref()
                    .and_then(|rt| rt.extended_tweet.as_ref())
                    .ok_or_else(|| SchemaError::missing(id, "retweeted_status.extended_tweet"))?;
                let text = ext
                    .full_text
                    .as_deref()
                    .ok_or_else(|| SchemaError::missing(id, "retweeted_status.extended_tweet.full_text"))?;
                let entities = ext
                    .entities
                    .as_ref()
                    .ok_or_else(|| SchemaError::missing(id, "retweeted_status.extended_tweet.entities"))?;
                Ok((text, entities))
            }
            TweetShape::Plain => {
                if self.truncated {
                    // truncated original without its extended part
                    return Err(SchemaError::missing(id, "extended_tweet"));
                }
                let text = self.text.as_deref().ok_or_else(|| SchemaError::missing(id, "text"))?;
                let entities = self
                    .entities
                    .as_ref()
                    .ok_or_else(|| SchemaError::missing(id, "entities"))?;
                Ok((text, entities))
            }
        }
    }

    /// true if the tweet carries at least one entity of `kind`.
    ///
    /// A tweet embedding a retweet can carry the entity at two nesting levels,
    /// both are checked.
    pub fn has_entity(&self, kind: EntityKind) -> Result<bool, SchemaError> {
        let top = self.entities.as_ref().map_or(false, |e| e.has(kind));

        if self.truncated {
            if let Some(ext) = &self.extended_tweet {
                return Ok(ext.entities.as_ref().map_or(false, |e| e.has(kind)));
            }
        }

        if let Some(rt) = &self.retweeted_status {
            let nested = if rt.truncated {
                let ext = rt
                    .extended_tweet
                    .as_ref()
                    .ok_or_else(|| SchemaError::missing(self.display_id(), "retweeted_status.extended_tweet"))?;
                ext.entities.as_ref().map_or(false, |e| e.has(kind))
            } else {
                rt.entities.as_ref().map_or(false, |e| e.has(kind))
            };
            return Ok(top || nested);
        }

        if self.truncated {
            return Err(SchemaError::missing(self.display_id(), "extended_tweet"));
        }
        Ok(top)
    }

    fn author_id(&self, id: &str) -> Result<String, SchemaError> {
        let user = self.user.as_ref().ok_or_else(|| SchemaError::missing(id, "user"))?;
        user.id_str
            .clone()
            .or_else(|| user.id.map(|uid| uid.to_string()))
            .ok_or_else(|| SchemaError::missing(id, "user.id"))
    }

    /// creation time in epoch seconds
    fn created_at_epoch(&self, id: &str) -> Result<i64, SchemaError> {
        if let Some(ms) = &self.timestamp_ms {
            let ms: i64 = ms
                .trim()
                .parse()
                .map_err(|e| SchemaError::invalid(id, "timestamp_ms", format!("{e}")))?;
            return Ok(ms.div_euclid(1000));
        }
        match &self.created_at {
            Some(CreatedAt::Epoch(secs)) => Ok(*secs),
            Some(CreatedAt::Text(s)) => DateTime::parse_from_str(s, TWITTER_DATE_FORMAT)
                .or_else(|_| DateTime::parse_from_rfc3339(s))
                .map(|dt| dt.timestamp())
                .map_err(|e| SchemaError::invalid(id, "created_at", format!("`{s}`: {e}"))),
            None => Err(SchemaError::missing(id, "created_at")),
        }
    }
}

/// Resolve one stored record into its canonical form.
///
/// Text precedence: extended tweet, then a non-truncated retweet, then the
/// extended part of a truncated retweet, then the tweet's own text.
/// A record missing the field its shape requires is a [`SchemaError`].
pub fn normalize(raw: &RawTweet) -> Result<CanonicalTweet, SchemaError> {
    let id = raw.tweet_id()?;
    let shape = raw.shape();
    let (text, entities) = raw.resolve_text(&id, shape)?;

    Ok(CanonicalTweet {
        shape,
        text: text.to_string(),
        hashtags: entities.hashtags.clone(),
        author_id: raw.author_id(&id)?,
        is_retweet: raw.retweeted_status.is_some() || raw.retweeted,
        has_urls: raw.has_entity(EntityKind::Urls)?,
        has_mentions: raw.has_entity(EntityKind::UserMentions)?,
        created_at: raw.created_at_epoch(&id)?,
        id,
    })
}
