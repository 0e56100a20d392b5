use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A concrete tee time the model found on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeeTime {
    pub time: String,
    pub players: u32,
    pub price: Option<String>,
    pub notes: Option<String>,
}

/// The link most likely to lead to a reservation page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingLink {
    pub url: String,
    pub link_text: String,
    pub reason: String,
}

/// One answer per inference call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionResult {
    TeeTime(TeeTime),
    BookingLink(BookingLink),
    Empty,
}

impl ExtractionResult {
    pub fn as_booking_link(&self) -> Option<&BookingLink> {
        match self {
            Self::BookingLink(link) => Some(link),
            _ => None,
        }
    }
}

impl Display for ExtractionResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TeeTime(tee) => {
                writeln!(f, "NEXT TEE TIME:")?;
                writeln!(f, "- Time: {}", tee.time)?;
                write!(f, "- Available for: {} player(s)", tee.players)?;
                if let Some(price) = &tee.price {
                    write!(f, "\n- Price: {}", price)?;
                }
                if let Some(notes) = &tee.notes {
                    write!(f, "\n- Notes: {}", notes)?;
                }
                Ok(())
            }
            Self::BookingLink(link) => {
                writeln!(f, "BOOKING LINK:")?;
                writeln!(f, "- URL: {}", link.url)?;
                writeln!(f, "- Text: {}", link.link_text)?;
                write!(f, "- Reason: {}", link.reason)
            }
            Self::Empty => write!(f, "No tee time or booking link found."),
        }
    }
}
