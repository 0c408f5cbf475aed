const QUESTION_OPENERS: [&str; 4] = ["what if", "ever wondered", "did you know", "have you ever"];

const CURIOSITY_PHRASES: [&str; 15] = [
    "secret",
    "secrets",
    "nobody tells you",
    "no one tells you",
    "you won't believe",
    "here's why",
    "heres why",
    "the truth about",
    "what happened next",
    "the reason why",
    "little known",
    "hidden",
    "revealed",
    "you didn't know",
    "turns out",
];

const NEGATIVE_PHRASES: [&str; 15] = [
    "stop",
    "never",
    "mistake",
    "mistakes",
    "worst",
    "don't",
    "avoid",
    "wrong",
    "fail",
    "failed",
    "regret",
    "ruin",
    "ruining",
    "toxic",
    "quit",
];

const BOLD_CLAIM_PHRASES: [&str; 11] = [
    "always",
    "best",
    "guaranteed",
    "everyone",
    "nobody",
    "the only",
    "literally",
    "game changer",
    "life changing",
    "ever",
    "proven",
];

const PERSONAL_STORY_OPENERS: [&str; 11] = [
    "i",
    "my",
    "when i",
    "story time",
    "storytime",
    "last year i",
    "i used to",
    "years ago",
    "the day i",
    "so i",
    "pov",
];

const DELAYED_PAYOFF_PHRASES: [&str; 12] = [
    "wait for it",
    "wait till the end",
    "wait until the end",
    "watch till the end",
    "watch until the end",
    "stay till the end",
    "stay until the end",
    "at the end",
    "keep watching",
    "part 2",
    "you'll see",
    "the ending",
];

const PATTERN_INTERRUPT_PHRASES: [&str; 10] = [
    "but then",
    "plot twist",
    "suddenly",
    "here's the thing",
    "but wait",
    "stop scrolling",
    "hold on",
    "wait what",
    "instead",
    "unexpected",
];

const CALL_TO_ACTION_PHRASES: [&str; 15] = [
    "follow",
    "comment",
    "comments",
    "share",
    "save this",
    "save it",
    "link in bio",
    "subscribe",
    "tag a friend",
    "tag someone",
    "like this",
    "let me know",
    "drop a",
    "dm me",
    "repost",
];

const AUTHENTICITY_PHRASES: [&str; 12] = [
    "i",
    "i'm",
    "im",
    "me",
    "my",
    "myself",
    "i've",
    "honestly",
    "real talk",
    "confession",
    "personally",
    "truth is",
];

const DENSE_WORD_COUNT: usize = 50;
const SHORT_CHAR_LIMIT: usize = 300;
const PUNCHY_OPENING_LIMIT: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulePattern {
    QuestionHook,
    CuriosityGap,
    NegativeFraming,
    BoldClaim,
    PersonalStory,
    LoopStructure,
    DelayedPayoff,
    PatternInterrupt,
    InformationDensity,
    EmotionalArc,
    ShortDuration,
    PunchyOpening,
    CallToAction,
    Authenticity,
}

impl RulePattern {
    pub const ALL: [RulePattern; 14] = [
        RulePattern::QuestionHook,
        RulePattern::CuriosityGap,
        RulePattern::NegativeFraming,
        RulePattern::BoldClaim,
        RulePattern::PersonalStory,
        RulePattern::LoopStructure,
        RulePattern::DelayedPayoff,
        RulePattern::PatternInterrupt,
        RulePattern::InformationDensity,
        RulePattern::EmotionalArc,
        RulePattern::ShortDuration,
        RulePattern::PunchyOpening,
        RulePattern::CallToAction,
        RulePattern::Authenticity,
    ];

    pub fn from_name(value: &str) -> Option<Self> {
        let key = value.trim().to_lowercase().replace('-', "_");
        RulePattern::ALL
            .into_iter()
            .find(|pattern| pattern.name() == key)
    }

    pub fn name(self) -> &'static str {
        match self {
            RulePattern::QuestionHook => "question_hook",
            RulePattern::CuriosityGap => "curiosity_gap",
            RulePattern::NegativeFraming => "negative_framing",
            RulePattern::BoldClaim => "bold_claim",
            RulePattern::PersonalStory => "personal_story",
            RulePattern::LoopStructure => "loop_structure",
            RulePattern::DelayedPayoff => "delayed_payoff",
            RulePattern::PatternInterrupt => "pattern_interrupt",
            RulePattern::InformationDensity => "information_density",
            RulePattern::EmotionalArc => "emotional_arc",
            RulePattern::ShortDuration => "short_duration",
            RulePattern::PunchyOpening => "punchy_opening",
            RulePattern::CallToAction => "call_to_action",
            RulePattern::Authenticity => "authenticity",
        }
    }

    pub fn matches(self, content: &ContentView) -> bool {
        match self {
            RulePattern::QuestionHook => {
                content.first_sentence_raw().ends_with('?')
                    || content.starts_with_any(&QUESTION_OPENERS)
            }
            RulePattern::CuriosityGap => content.contains_any(&CURIOSITY_PHRASES),
            RulePattern::NegativeFraming => content.contains_any(&NEGATIVE_PHRASES),
            RulePattern::BoldClaim => {
                content.contains_any(&BOLD_CLAIM_PHRASES) || content.lower.contains("100%")
            }
            RulePattern::PersonalStory => content.starts_with_any(&PERSONAL_STORY_OPENERS),
            // Needs the rendered video, which this engine never sees.
            RulePattern::LoopStructure => false,
            RulePattern::DelayedPayoff => content.contains_any(&DELAYED_PAYOFF_PHRASES),
            RulePattern::PatternInterrupt => content.contains_any(&PATTERN_INTERRUPT_PHRASES),
            RulePattern::InformationDensity => content.word_count > DENSE_WORD_COUNT,
            // Needs a full narrative analysis.
            RulePattern::EmotionalArc => false,
            RulePattern::ShortDuration => content.char_count < SHORT_CHAR_LIMIT,
            RulePattern::PunchyOpening => {
                let opening = content.first_sentence_body();
                !opening.is_empty() && opening.chars().count() <= PUNCHY_OPENING_LIMIT
            }
            RulePattern::CallToAction => content.contains_any(&CALL_TO_ACTION_PHRASES),
            RulePattern::Authenticity => content.contains_any(&AUTHENTICITY_PHRASES),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentView {
    trimmed: String,
    lower: String,
    padded_words: String,
    pub word_count: usize,
    pub char_count: usize,
}

impl ContentView {
    pub fn new(content: &str) -> Self {
        let trimmed = content.trim().to_string();
        let lower = trimmed.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
        let words: Vec<&str> = lower
            .split(|ch: char| !(ch.is_alphanumeric() || ch == '\''))
            .map(|word| word.trim_matches('\''))
            .filter(|word| !word.is_empty())
            .collect();
        let padded_words = format!(" {} ", words.join(" "));

        Self {
            word_count: trimmed.split_whitespace().count(),
            char_count: trimmed.chars().count(),
            padded_words,
            lower,
            trimmed,
        }
    }

    fn contains_any(&self, phrases: &[&str]) -> bool {
        phrases
            .iter()
            .any(|phrase| self.padded_words.contains(&format!(" {} ", phrase)))
    }

    fn starts_with_any(&self, phrases: &[&str]) -> bool {
        phrases
            .iter()
            .any(|phrase| self.padded_words.starts_with(&format!(" {} ", phrase)))
    }

    fn first_sentence_raw(&self) -> &str {
        match self.trimmed.find(['.', '!', '?']) {
            Some(idx) => &self.trimmed[..=idx],
            None => &self.trimmed,
        }
    }

    fn first_sentence_body(&self) -> &str {
        match self.trimmed.find(['.', '!', '?']) {
            Some(idx) => self.trimmed[..idx].trim(),
            None => &self.trimmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hits(pattern: RulePattern, text: &str) -> bool {
        pattern.matches(&ContentView::new(text))
    }

    #[test]
    fn every_pattern_round_trips_its_name() {
        for pattern in RulePattern::ALL {
            assert_eq!(RulePattern::from_name(pattern.name()), Some(pattern));
        }
        assert_eq!(RulePattern::from_name("Question-Hook"), Some(RulePattern::QuestionHook));
        assert_eq!(RulePattern::from_name("sentiment_spike"), None);
    }

    #[test]
    fn keyword_patterns_respect_word_boundaries() {
        assert!(hits(RulePattern::CallToAction, "Follow for part two"));
        assert!(!hits(RulePattern::CallToAction, "Followers grew fast"));
        assert!(hits(RulePattern::NegativeFraming, "Don\u{2019}t do this at the gym"));
        assert!(hits(RulePattern::CuriosityGap, "You won't believe what happened"));
    }

    #[test]
    fn structural_patterns() {
        assert!(hits(RulePattern::PersonalStory, "I quit my job last week."));
        assert!(!hits(RulePattern::PersonalStory, "Investing basics for beginners."));
        assert!(hits(RulePattern::PunchyOpening, "Short and sharp. Then a long tail follows."));
        assert!(!hits(RulePattern::PunchyOpening, &"word ".repeat(30)));
        assert!(hits(RulePattern::InformationDensity, &"word ".repeat(51)));
        assert!(!hits(RulePattern::InformationDensity, &"word ".repeat(50)));
        assert!(!hits(RulePattern::LoopStructure, "This loops back to the start"));
        assert!(!hits(RulePattern::EmotionalArc, "From despair to joy"));
    }
}
