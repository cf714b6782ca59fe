//! Task selection for multi-task export
//!
//! The ID list and the date range are combined as a union: a task is picked
//! when either filter matches it.

use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::{TaskManError, TaskManResult};
use crate::models::Task;

/// Inclusive creation-time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at <= self.to
    }
}

fn parse_day(input: &str) -> TaskManResult<NaiveDate> {
    let format = match input.len() {
        10 => "%Y-%m-%d",
        8 => "%Y%m%d",
        _ => return Err(TaskManError::Validation(format!("invalid date: {:?}", input))),
    };
    NaiveDate::parse_from_str(input, format)
        .map_err(|_| TaskManError::Validation(format!("invalid date: {:?}", input)))
}

fn local_bound(day: NaiveDate, time: NaiveTime) -> TaskManResult<DateTime<Utc>> {
    Local
        .from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| TaskManError::Validation(format!("no local time for {}", day)))
}

/// Parse `from..to` with `YYYY-MM-DD` or `YYYYMMDD` dates
///
/// Bounds are local midnight of `from` through the last millisecond of `to`.
pub fn parse_date_range(input: &str) -> TaskManResult<DateRange> {
    let (left, right) = input
        .split_once("..")
        .ok_or_else(|| TaskManError::Validation("expected from..to".into()))?;
    let (left, right) = (left.trim(), right.trim());
    if left.is_empty() || right.is_empty() {
        return Err(TaskManError::Validation(
            "both from and to are required".into(),
        ));
    }

    let start_of_day = NaiveTime::MIN;
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);

    let range = DateRange {
        from: local_bound(parse_day(left)?, start_of_day)?,
        to: local_bound(parse_day(right)?, end_of_day)?,
    };
    if range.from > range.to {
        return Err(TaskManError::Validation(format!(
            "date range ends before it starts: {}",
            input
        )));
    }
    Ok(range)
}

/// Split a comma-separated ID list, dropping blanks
pub fn parse_id_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Filters for a multi-task export
#[derive(Debug, Clone, Default)]
pub struct TaskSelection {
    pub ids: Vec<String>,
    pub date_range: Option<DateRange>,
}

impl TaskSelection {
    /// Whether no filter is set, which selects nothing
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.date_range.is_none()
    }

    /// Tasks matching any filter, in the given order
    pub fn select(&self, tasks: &[Task]) -> Vec<Task> {
        let ids: HashSet<&str> = self.ids.iter().map(String::as_str).collect();

        tasks
            .iter()
            .filter(|task| {
                ids.contains(task.id.as_str())
                    || self.date_range.is_some_and(|r| r.contains(task.created_at))
            })
            .cloned()
            .collect()
    }
}

/// Default archive name for an export of `ids`
///
/// `<editor>-<plugin id>-<parts>.zip` with the editor name lowercased and its
/// spaces removed. With several IDs each part is the ID up to its first `-`.
pub fn default_export_name(editor: &str, plugin_id: &str, ids: &[String]) -> String {
    let first_segment = ids.len() > 1;
    let parts: Vec<&str> = ids
        .iter()
        .map(|id| match id.find('-') {
            Some(i) if first_segment && i > 0 => &id[..i],
            _ => id.as_str(),
        })
        .collect();

    let editor = editor.replace(' ', "").to_lowercase();
    format!("{}-{}-{}.zip", editor, plugin_id, parts.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn task_on(id: &str, y: i32, m: u32, d: u32) -> Task {
        let noon = Local
            .with_ymd_and_hms(y, m, d, 12, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        Task::new(id, format!("/tmp/{}", id), noon)
    }

    fn sample() -> Vec<Task> {
        vec![
            task_on("t1", 2024, 1, 1),
            task_on("t2", 2024, 6, 15),
            task_on("t3", 2024, 12, 31),
        ]
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_selection_is_union() {
        let selection = TaskSelection {
            ids: vec!["t1".into()],
            date_range: Some(parse_date_range("2024-06-01..2024-06-30").unwrap()),
        };
        assert_eq!(ids(&selection.select(&sample())), vec!["t1", "t2"]);
    }

    #[test]
    fn test_selection_single_filters() {
        let by_id = TaskSelection {
            ids: vec!["t3".into(), "missing".into()],
            date_range: None,
        };
        assert_eq!(ids(&by_id.select(&sample())), vec!["t3"]);

        let by_date = TaskSelection {
            ids: Vec::new(),
            date_range: Some(parse_date_range("20240101..20240615").unwrap()),
        };
        assert_eq!(ids(&by_date.select(&sample())), vec!["t1", "t2"]);
    }

    #[test]
    fn test_empty_selection_selects_nothing() {
        let selection = TaskSelection::default();
        assert!(selection.is_empty());
        assert!(selection.select(&sample()).is_empty());
    }

    #[test]
    fn test_date_range_bounds_are_inclusive_days() {
        let range = parse_date_range("2024-06-15..2024-06-15").unwrap();
        let start = Local
            .with_ymd_and_hms(2024, 6, 15, 0, 0, 0)
            .earliest()
            .unwrap()
            .with_timezone(&Utc);
        assert!(range.contains(start));
        assert!(range.contains(start + Duration::hours(23) + Duration::minutes(59)));
        assert!(!range.contains(start - Duration::seconds(1)));
        assert!(!range.contains(start + Duration::days(1)));
    }

    #[test]
    fn test_date_range_errors() {
        assert!(parse_date_range("2024-06-01").is_err());
        assert!(parse_date_range("..2024-06-01").is_err());
        assert!(parse_date_range("2024-06-01..").is_err());
        assert!(parse_date_range("2024/06/01..2024/06/02").is_err());
        assert!(parse_date_range("2024-13-01..2024-12-01").is_err());
        assert!(parse_date_range("2024-06-02..2024-06-01").is_err());
        assert!(parse_date_range(" 2024-06-01 .. 20240602 ").is_ok());
    }

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list(" a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_default_export_name() {
        let ids = vec!["1712-abcd".to_string(), "1713-ef".to_string()];
        assert_eq!(
            default_export_name("Code - Insiders", "RooVeterinaryInc.roo-cline", &ids),
            "code-insiders-RooVeterinaryInc.roo-cline-1712_1713.zip"
        );

        let one = vec!["1712-abcd".to_string()];
        assert_eq!(
            default_export_name("VSCodium", "p", &one),
            "vscodium-p-1712-abcd.zip"
        );
    }
}
