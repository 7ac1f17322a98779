//! Answer keys and scoring
//!
//! An [`AnswerKey`] maps each booklet group to its expected answers. It is
//! validated on construction and never changes afterwards, so one key can be
//! shared by every worker of a batch.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::layout::{ANSWER_LETTERS, BLANK_MARK, MULTIPLE_MARK, QUESTION_COUNT};
use crate::form::Group;
use crate::{Result, ScanError};

/// Expected answers per group
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerKey {
    keys: BTreeMap<Group, Vec<char>>,
}

impl AnswerKey {
    /// Key with no graded group
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the answers of `group`
    ///
    /// An empty string leaves the group ungraded. Otherwise the key must hold
    /// one letter `A`-`E` per question.
    pub fn insert(&mut self, group: Group, answers: &str) -> Result<()> {
        if group == Group::Unknown {
            return Err(ScanError::malformed_key("cannot register a key for an unknown group"));
        }

        let answers: Vec<char> = answers.trim().chars().collect();
        if answers.is_empty() {
            self.keys.remove(&group);
            return Ok(());
        }

        if let Some((position, letter)) = answers
            .iter()
            .enumerate()
            .find(|(_, c)| !ANSWER_LETTERS.contains(c))
        {
            return Err(ScanError::malformed_key(format!(
                "group {} question {} has invalid answer '{}'",
                group,
                position + 1,
                letter
            )));
        }
        if answers.len() != QUESTION_COUNT {
            return Err(ScanError::malformed_key(format!(
                "group {} has {} answers, expected {}",
                group,
                answers.len(),
                QUESTION_COUNT
            )));
        }

        self.keys.insert(group, answers);
        Ok(())
    }

    /// Builder form of [`AnswerKey::insert`]
    pub fn with_group(mut self, group: Group, answers: &str) -> Result<Self> {
        self.insert(group, answers)?;
        Ok(self)
    }

    /// Parse a JSON object mapping group letters to answer strings
    ///
    /// ```
    /// use optic_form_reader::{AnswerKey, Group};
    ///
    /// let key = AnswerKey::from_json_str(r#"{"A": "ABCDEABCDEABCDEABCDE", "B": ""}"#)?;
    /// assert!(key.get(Group::A).is_some());
    /// assert!(key.get(Group::B).is_none());
    /// # Ok::<(), optic_form_reader::ScanError>(())
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| ScanError::config("cannot parse answer key", e))?;

        let mut key = Self::new();
        for (name, answers) in &raw {
            let group = single_letter(name)
                .and_then(Group::from_letter)
                .ok_or_else(|| ScanError::malformed_key(format!("unknown group '{}'", name)))?;
            key.insert(group, answers)?;
        }
        Ok(key)
    }

    /// Load a key written in the [`AnswerKey::from_json_str`] format
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScanError::config(format!("cannot read {}", path.display()), e))?;
        Self::from_json_str(&content)
    }

    /// Serialize as a JSON object of group letters to answer strings
    pub fn to_json_string(&self) -> Result<String> {
        let raw: BTreeMap<String, String> = self
            .keys
            .iter()
            .map(|(group, answers)| (group.to_string(), answers.iter().collect()))
            .collect();
        serde_json::to_string_pretty(&raw)
            .map_err(|e| ScanError::config("cannot serialize answer key", e))
    }

    /// Expected answers of `group`, if it is graded
    pub fn get(&self, group: Group) -> Option<&[char]> {
        self.keys.get(&group).map(Vec::as_slice)
    }

    pub fn graded_groups(&self) -> impl Iterator<Item = Group> + '_ {
        self.keys.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn single_letter(name: &str) -> Option<char> {
    let mut chars = name.trim().chars();
    let letter = chars.next()?;
    chars.next().is_none().then_some(letter)
}

/// Correct, wrong and blank counts of one sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct: usize,
    pub wrong: usize,
    pub blank: usize,
}

impl ScoreResult {
    /// Result of a sheet whose group has no key
    pub fn ungraded() -> Self {
        Self {
            correct: 0,
            wrong: 0,
            blank: QUESTION_COUNT,
        }
    }

    pub fn total(&self) -> usize {
        self.correct + self.wrong + self.blank
    }
}

impl fmt::Display for ScoreResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "correct {}, wrong {}, blank {}",
            self.correct, self.wrong, self.blank
        )
    }
}

/// Score decoded answers against the key of `group`
///
/// An unknown or ungraded group scores as all blank. `X` counts as blank;
/// `M` and any letter other than the key's count as wrong.
///
/// # Errors
///
/// Returns `ScanError::MalformedAnswerKey` if the decoded answers and the key
/// differ in length.
pub fn score(answers: &str, group: Group, key: &AnswerKey) -> Result<ScoreResult> {
    let Some(expected) = key.get(group) else {
        return Ok(ScoreResult::ungraded());
    };

    let answers: Vec<char> = answers.chars().collect();
    if answers.len() != expected.len() {
        return Err(ScanError::malformed_key(format!(
            "group {} key has {} answers but the sheet has {} questions",
            group,
            expected.len(),
            answers.len()
        )));
    }

    let mut result = ScoreResult::default();
    for (given, wanted) in answers.iter().zip(expected) {
        match *given {
            BLANK_MARK => result.blank += 1,
            MULTIPLE_MARK => result.wrong += 1,
            c if c == *wanted => result.correct += 1,
            _ => result.wrong += 1,
        }
    }
    Ok(result)
}
