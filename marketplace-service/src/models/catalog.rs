//! Catalog records read during cart validation and checkout. The catalog is
//! maintained elsewhere; this service never writes these collections outside
//! of seeding.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub price: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Instagram,
    YouTube,
    TikTok,
    LinkedIn,
    Facebook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    Story,
    Post,
    Reel,
    #[serde(rename = "Video Shoutout")]
    VideoShoutout,
    #[serde(rename = "Live Session")]
    LiveSession,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentType::Story => "Story",
            ContentType::Post => "Post",
            ContentType::Reel => "Reel",
            ContentType::VideoShoutout => "Video Shoutout",
            ContentType::LiveSession => "Live Session",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCardPrice {
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub negotiable: bool,
}

/// An influencer's published price for one platform and content type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateCard {
    #[serde(rename = "_id")]
    pub id: String,
    pub owner_id: String,
    pub platform: Platform,
    pub content_type: ContentType,
    pub price: RateCardPrice,
    #[serde(default)]
    pub description: Option<String>,
}

impl RateCard {
    /// True when the requested platform/content type (if any) agree with this card.
    pub fn matches(&self, platform: Option<Platform>, content_type: Option<ContentType>) -> bool {
        platform.map_or(true, |p| p == self.platform)
            && content_type.map_or(true, |c| c == self.content_type)
    }
}
