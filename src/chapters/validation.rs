//! # 章节数据校验
//!
//! 将任意 JSON 对象校验为 `NewChapter`。未知字段被忽略，
//! 数值字段接受数字或数字字符串，所有错误一次性收集。

use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::types::{
    CLASSES, ChapterMetadata, ChapterStatus, Difficulty, NewChapter, SUBJECTS, UNIT_RANGE,
};

const TITLE_MAX_LEN: usize = 200;
const DESCRIPTION_MAX_LEN: usize = 1000;

/// 校验单个章节对象
pub fn validate_chapter(value: &Value) -> Result<NewChapter, Vec<String>> {
    let Value::Object(input) = value else {
        return Err(vec!["Chapter must be a JSON object".to_string()]);
    };

    let mut errors = Vec::new();

    let title = match trimmed_string(input, "title", &mut errors) {
        Some(t) if t.is_empty() => {
            errors.push("Chapter title is required".to_string());
            None
        }
        Some(t) if t.chars().count() > TITLE_MAX_LEN => {
            errors.push(format!("Title cannot exceed {TITLE_MAX_LEN} characters"));
            None
        }
        Some(t) => Some(t),
        None => {
            if is_absent(input, "title") {
                errors.push("Chapter title is required".to_string());
            }
            None
        }
    };

    let class = match input.get("class") {
        None | Some(Value::Null) => {
            errors.push("Class is required".to_string());
            None
        }
        Some(v) => {
            let class = match v {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            };
            match class {
                Some(c) if CLASSES.contains(&c.as_str()) => Some(c),
                _ => {
                    errors.push("Class must be between 6 and 12".to_string());
                    None
                }
            }
        }
    };

    let unit = match integer(input, "unit", &mut errors) {
        None if is_absent(input, "unit") => {
            errors.push("Unit number is required".to_string());
            None
        }
        Some(n) if n < *UNIT_RANGE.start() => {
            errors.push("Unit must be at least 1".to_string());
            None
        }
        Some(n) if n > *UNIT_RANGE.end() => {
            errors.push("Unit cannot exceed 20".to_string());
            None
        }
        other => other.and_then(|n| i32::try_from(n).ok()),
    };

    let subject = match trimmed_string(input, "subject", &mut errors) {
        Some(s) if SUBJECTS.contains(&s.as_str()) => Some(s),
        Some(_) => {
            errors.push("Invalid subject".to_string());
            None
        }
        None => {
            if is_absent(input, "subject") {
                errors.push("Subject is required".to_string());
            }
            None
        }
    };

    let status = match trimmed_string(input, "status", &mut errors) {
        None => ChapterStatus::default(),
        Some(s) => ChapterStatus::parse(&s).unwrap_or_else(|| {
            errors.push(
                "Status must be one of: completed, in-progress, not-started, under-review"
                    .to_string(),
            );
            ChapterStatus::default()
        }),
    };

    let difficulty = match trimmed_string(input, "difficulty", &mut errors) {
        None => Difficulty::default(),
        Some(d) => Difficulty::parse(&d).unwrap_or_else(|| {
            errors.push("Difficulty must be one of: easy, medium, hard".to_string());
            Difficulty::default()
        }),
    };

    let weak_chapters = match input.get("weakChapters") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s == "true" || s == "false" => s == "true",
        Some(_) => {
            errors.push("weakChapters must be a boolean".to_string());
            false
        }
    };

    let description = match trimmed_string(input, "description", &mut errors) {
        Some(d) if d.chars().count() > DESCRIPTION_MAX_LEN => {
            errors.push(format!(
                "Description cannot exceed {DESCRIPTION_MAX_LEN} characters"
            ));
            None
        }
        other => other,
    };

    let topics = match input.get("topics") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let topics: Option<Vec<String>> = items
                .iter()
                .map(|t| t.as_str().map(|s| s.trim().to_string()))
                .collect();
            topics.unwrap_or_else(|| {
                errors.push("Topics must be a list of strings".to_string());
                Vec::new()
            })
        }
        Some(_) => {
            errors.push("Topics must be a list of strings".to_string());
            Vec::new()
        }
    };

    let estimated_duration = match integer(input, "estimatedDuration", &mut errors) {
        Some(n) if n < 1 => {
            errors.push("Duration must be at least 1 minute".to_string());
            None
        }
        Some(n) if n > 600 => {
            errors.push("Duration cannot exceed 600 minutes".to_string());
            None
        }
        other => other.and_then(|n| i32::try_from(n).ok()),
    };

    let completion_percentage = match number(input, "completionPercentage", &mut errors) {
        None => 0,
        Some(n) if n < 0.0 => {
            errors.push("Completion percentage cannot be negative".to_string());
            0
        }
        Some(n) if n > 100.0 => {
            errors.push("Completion percentage cannot exceed 100".to_string());
            0
        }
        #[allow(clippy::cast_possible_truncation)]
        Some(n) => n.round() as i32,
    };

    let metadata = match input.get("metadata") {
        None | Some(Value::Null) => ChapterMetadata::default(),
        Some(Value::Object(meta)) => validate_metadata(meta, &mut errors),
        Some(_) => {
            errors.push("Metadata must be an object".to_string());
            ChapterMetadata::default()
        }
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    match (title, class, unit, subject) {
        (Some(title), Some(class), Some(unit), Some(subject)) => Ok(NewChapter {
            title,
            class,
            unit,
            subject,
            status,
            difficulty,
            weak_chapters,
            description: description.filter(|d| !d.is_empty()),
            topics,
            estimated_duration,
            completion_percentage,
            metadata,
        }),
        _ => Err(vec!["Chapter is missing required fields".to_string()]),
    }
}

fn validate_metadata(meta: &Map<String, Value>, errors: &mut Vec<String>) -> ChapterMetadata {
    let mut out = ChapterMetadata::default();

    for (field, target) in [
        ("totalQuestions", &mut out.total_questions),
        ("correctAnswers", &mut out.correct_answers),
    ] {
        if let Some(n) = integer(meta, field, errors) {
            match u64::try_from(n) {
                Ok(n) => *target = n,
                Err(_) => errors.push(format!("metadata.{field} cannot be negative")),
            }
        }
    }

    if let Some(score) = number(meta, "averageScore", errors) {
        if (0.0..=100.0).contains(&score) {
            out.average_score = score;
        } else {
            errors.push("metadata.averageScore must be between 0 and 100".to_string());
        }
    }

    match meta.get("yearWiseQuestionCount") {
        None | Some(Value::Null) => {}
        Some(Value::Object(years)) => {
            let counts: Option<BTreeMap<String, u64>> = years
                .iter()
                .map(|(year, count)| count.as_u64().map(|c| (year.clone(), c)))
                .collect();
            match counts {
                Some(counts) => out.year_wise_question_count = counts,
                None => errors.push(
                    "metadata.yearWiseQuestionCount values must be non-negative integers"
                        .to_string(),
                ),
            }
        }
        Some(_) => {
            errors.push("metadata.yearWiseQuestionCount must be an object".to_string());
        }
    }

    out
}

fn is_absent(input: &Map<String, Value>, field: &str) -> bool {
    matches!(input.get(field), None | Some(Value::Null))
}

/// 可选字符串字段；类型错误时记录错误并返回 `None`
fn trimmed_string(input: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> Option<String> {
    match input.get(field) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.push(format!("{field} must be a string"));
            None
        }
    }
}

fn number(input: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> Option<f64> {
    let parsed = match input.get(field) {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        Some(_) => None,
    };
    if parsed.is_none() {
        errors.push(format!("{field} must be a number"));
    }
    parsed
}

fn integer(input: &Map<String, Value>, field: &str, errors: &mut Vec<String>) -> Option<i64> {
    let parsed = match input.get(field) {
        None | Some(Value::Null) => return None,
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    };
    if parsed.is_none() {
        errors.push(format!("{field} must be an integer"));
    }
    parsed
}
