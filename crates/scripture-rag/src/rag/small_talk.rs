//! Canned replies for greetings and courtesies.

use crate::config::SmallTalkConfig;
use crate::fuzzy;

/// Greeting phrase -> reply. Phrase order is the tie-break order.
pub const GREETINGS: &[(&str, &str)] = &[
    ("hello", "Hey there! Ready to dive into the Word?"),
    ("hi", "Hi! What would you like to explore today?"),
    ("hey", "Hey! How can I help your study?"),
    ("hey there", "Hi there! Feel free to ask anything."),
    ("yo", "Yo! Bible questions welcome."),
    ("peace be with you", "And also with you. Let's explore the scriptures together."),
    ("blessings", "Blessings to you too. How can I serve your study?"),
    ("good morning", "Good morning! Let's begin today's study."),
    ("good afternoon", "Good afternoon! What would you like to look at?"),
    ("good evening", "Good evening. I'm here to support your Bible journey."),
    ("shalom", "Shalom! How can I assist with your Bible questions?"),
    ("greetings", "Greetings! I'm happy to help with your study."),
    ("thank you", "You're so welcome. It's a joy to walk this journey with you."),
    ("thanks", "Of course! I'm glad to be of help."),
];

pub const FALLBACK_REPLY: &str = "Hi there! I'm here to help with your Bible study. \
You can ask about a verse, a topic, or just say hello.";

pub fn greeting_phrases() -> Vec<String> {
    GREETINGS.iter().map(|(phrase, _)| phrase.to_string()).collect()
}

pub struct SmallTalk {
    config: SmallTalkConfig,
}

impl SmallTalk {
    pub fn new(config: SmallTalkConfig) -> Self {
        Self { config }
    }

    pub fn respond(&self, input: &str) -> &'static str {
        let query = input.trim().to_lowercase();
        let phrases = GREETINGS.iter().map(|(phrase, _)| phrase);
        let candidates = fuzzy::top_matches(&query, phrases, self.config.candidate_limit);

        match candidates.first() {
            Some(best) if best.score > self.config.threshold => {
                tracing::debug!(phrase = %best.candidate, score = best.score, "Small-talk match");
                GREETINGS[best.index].1
            }
            _ => FALLBACK_REPLY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_talk() -> SmallTalk {
        SmallTalk::new(SmallTalkConfig::default())
    }

    #[test]
    fn test_exact_greeting() {
        assert_eq!(small_talk().respond("Hi"), "Hi! What would you like to explore today?");
        assert_eq!(
            small_talk().respond("  Good Morning "),
            "Good morning! Let's begin today's study."
        );
    }

    #[test]
    fn test_close_greeting() {
        assert_eq!(small_talk().respond("shalom!"), GREETINGS[10].1);
    }

    #[test]
    fn test_unmatched_input_gets_fallback() {
        assert_eq!(small_talk().respond("qwv zzk"), FALLBACK_REPLY);
        assert_eq!(small_talk().respond(""), FALLBACK_REPLY);
    }

    #[test]
    fn test_phrases_match_table() {
        let phrases = greeting_phrases();
        assert_eq!(phrases.len(), GREETINGS.len());
        assert_eq!(phrases[0], "hello");
    }
}
