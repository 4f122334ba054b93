//! One owned handle per animated quantity.

use shared::{
    domain::{ActionToken, AnimatedQuantity, FadeTarget, TokenIssuer},
    protocol::Effect,
};

#[derive(Debug, Clone)]
pub struct TimerSlot {
    quantity: AnimatedQuantity,
    armed: Option<ActionToken>,
}

impl TimerSlot {
    pub fn new(quantity: AnimatedQuantity) -> Self {
        Self {
            quantity,
            armed: None,
        }
    }

    pub fn quantity(&self) -> AnimatedQuantity {
        self.quantity
    }

    pub fn armed(&self) -> Option<ActionToken> {
        self.armed
    }

    /// Installs a fresh token and returns it along with the one it superseded.
    pub fn arm(&mut self, tokens: &mut TokenIssuer) -> (ActionToken, Option<ActionToken>) {
        let token = tokens.issue();
        (token, self.armed.replace(token))
    }

    pub fn cancel(&mut self) -> Option<ActionToken> {
        self.armed.take()
    }

    pub fn is_current(&self, token: ActionToken) -> bool {
        self.armed == Some(token)
    }

    /// Releases the slot if `token` is the one currently armed.
    pub fn settle(&mut self, token: ActionToken) -> bool {
        if self.is_current(token) {
            self.armed = None;
            true
        } else {
            false
        }
    }

    pub fn cancel_effect(&self) -> Effect {
        match self.quantity {
            AnimatedQuantity::SegmentProgress => Effect::CancelProgress,
            AnimatedQuantity::DescriptionFade => Effect::CancelFade {
                target: FadeTarget::Description,
            },
            AnimatedQuantity::SectionFade => Effect::CancelFade {
                target: FadeTarget::Section,
            },
            AnimatedQuantity::Animation => Effect::CancelAnimation,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TimerSlots {
    progress: TimerSlot,
    description_fade: TimerSlot,
    section_fade: TimerSlot,
    animation: TimerSlot,
}

impl Default for TimerSlots {
    fn default() -> Self {
        Self {
            progress: TimerSlot::new(AnimatedQuantity::SegmentProgress),
            description_fade: TimerSlot::new(AnimatedQuantity::DescriptionFade),
            section_fade: TimerSlot::new(AnimatedQuantity::SectionFade),
            animation: TimerSlot::new(AnimatedQuantity::Animation),
        }
    }
}

impl TimerSlots {
    pub fn get(&self, quantity: AnimatedQuantity) -> &TimerSlot {
        match quantity {
            AnimatedQuantity::SegmentProgress => &self.progress,
            AnimatedQuantity::DescriptionFade => &self.description_fade,
            AnimatedQuantity::SectionFade => &self.section_fade,
            AnimatedQuantity::Animation => &self.animation,
        }
    }

    pub fn get_mut(&mut self, quantity: AnimatedQuantity) -> &mut TimerSlot {
        match quantity {
            AnimatedQuantity::SegmentProgress => &mut self.progress,
            AnimatedQuantity::DescriptionFade => &mut self.description_fade,
            AnimatedQuantity::SectionFade => &mut self.section_fade,
            AnimatedQuantity::Animation => &mut self.animation,
        }
    }

    /// Arms `quantity`, pushing a cancel effect first when a live handle is replaced.
    pub fn arm(
        &mut self,
        quantity: AnimatedQuantity,
        tokens: &mut TokenIssuer,
        effects: &mut Vec<Effect>,
    ) -> ActionToken {
        let slot = self.get_mut(quantity);
        let (token, superseded) = slot.arm(tokens);
        if superseded.is_some() {
            effects.push(slot.cancel_effect());
        }
        token
    }

    pub fn cancel(&mut self, quantity: AnimatedQuantity, effects: &mut Vec<Effect>) {
        let slot = self.get_mut(quantity);
        if slot.cancel().is_some() {
            effects.push(slot.cancel_effect());
        }
    }

    pub fn cancel_all(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        for quantity in [
            AnimatedQuantity::SegmentProgress,
            AnimatedQuantity::DescriptionFade,
            AnimatedQuantity::SectionFade,
            AnimatedQuantity::Animation,
        ] {
            self.cancel(quantity, &mut effects);
        }
        effects
    }

    pub fn any_armed(&self) -> bool {
        [
            &self.progress,
            &self.description_fade,
            &self.section_fade,
            &self.animation,
        ]
        .iter()
        .any(|slot| slot.armed().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arming_twice_reports_the_superseded_token() {
        let mut tokens = TokenIssuer::new();
        let mut slot = TimerSlot::new(AnimatedQuantity::SegmentProgress);

        let (first, superseded) = slot.arm(&mut tokens);
        assert_eq!(superseded, None);
        let (second, superseded) = slot.arm(&mut tokens);
        assert_eq!(superseded, Some(first));

        assert!(!slot.settle(first));
        assert!(slot.settle(second));
        assert_eq!(slot.armed(), None);
        assert!(!slot.settle(second));
    }

    #[test]
    fn rearming_a_live_quantity_cancels_it_first() {
        let mut tokens = TokenIssuer::new();
        let mut slots = TimerSlots::default();
        let mut effects = Vec::new();

        slots.arm(AnimatedQuantity::SectionFade, &mut tokens, &mut effects);
        assert!(effects.is_empty());
        slots.arm(AnimatedQuantity::SectionFade, &mut tokens, &mut effects);
        assert_eq!(
            effects,
            vec![Effect::CancelFade {
                target: FadeTarget::Section
            }]
        );
    }

    #[test]
    fn cancel_all_only_reports_live_handles() {
        let mut tokens = TokenIssuer::new();
        let mut slots = TimerSlots::default();
        let mut effects = Vec::new();
        slots.arm(AnimatedQuantity::SegmentProgress, &mut tokens, &mut effects);
        slots.arm(AnimatedQuantity::Animation, &mut tokens, &mut effects);

        assert_eq!(
            slots.cancel_all(),
            vec![Effect::CancelProgress, Effect::CancelAnimation]
        );
        assert!(!slots.any_armed());
        assert!(slots.cancel_all().is_empty());
    }
}
