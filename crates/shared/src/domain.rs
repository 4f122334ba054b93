use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident, $inner:ty) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(SegmentIndex, usize);
id_newtype!(PartIndex, usize);
id_newtype!(DescriptionId, u32);
id_newtype!(AnimationId, u32);
id_newtype!(ActionToken, u64);

/// Hands out action tokens that never repeat for the lifetime of the issuer.
#[derive(Debug, Default)]
pub struct TokenIssuer {
    last: u64,
}

impl TokenIssuer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> ActionToken {
        self.last = self.last.wrapping_add(1);
        ActionToken(self.last)
    }

    pub fn last_issued(&self) -> Option<ActionToken> {
        (self.last > 0).then_some(ActionToken(self.last))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentState {
    Pending,
    Active,
    Complete,
}

impl SegmentState {
    /// Segments before the active one are complete, segments after it are pending.
    /// Once the story has finished there is no active segment and everything is complete.
    pub fn derive(index: SegmentIndex, active: Option<SegmentIndex>) -> Self {
        match active {
            None => SegmentState::Complete,
            Some(active) if index < active => SegmentState::Complete,
            Some(active) if index == active => SegmentState::Active,
            Some(_) => SegmentState::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeTarget {
    /// Header text only.
    Description,
    /// Header text together with the animation block.
    Section,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeDirection {
    In,
    Out,
}

impl FadeDirection {
    pub fn target_opacity(self) -> f32 {
        match self {
            FadeDirection::In => 1.0,
            FadeDirection::Out => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimatedQuantity {
    SegmentProgress,
    DescriptionFade,
    SectionFade,
    Animation,
}

impl From<FadeTarget> for AnimatedQuantity {
    fn from(value: FadeTarget) -> Self {
        match value {
            FadeTarget::Description => AnimatedQuantity::DescriptionFade,
            FadeTarget::Section => AnimatedQuantity::SectionFade,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_always_distinct() {
        let mut issuer = TokenIssuer::new();
        assert_eq!(issuer.last_issued(), None);
        let first = issuer.issue();
        let second = issuer.issue();
        assert_ne!(first, second);
        assert!(second > first);
        assert_eq!(issuer.last_issued(), Some(second));
    }

    #[test]
    fn segment_state_follows_active_index() {
        let active = Some(SegmentIndex(2));
        assert_eq!(
            SegmentState::derive(SegmentIndex(0), active),
            SegmentState::Complete
        );
        assert_eq!(
            SegmentState::derive(SegmentIndex(2), active),
            SegmentState::Active
        );
        assert_eq!(
            SegmentState::derive(SegmentIndex(3), active),
            SegmentState::Pending
        );
        assert_eq!(
            SegmentState::derive(SegmentIndex(3), None),
            SegmentState::Complete
        );
    }

    #[test]
    fn ids_serialize_as_bare_numbers() {
        let raw = serde_json::to_string(&SegmentIndex(3)).expect("serialize");
        assert_eq!(raw, "3");
    }
}
