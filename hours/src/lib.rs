//! Work-log hour counter.
//!
//! A work log is a Markdown file made of `## Date:` headers followed by
//! `Hours:` lines. Unresolved lines (`Hours: ? (...)`) get their time ranges
//! summed and written back; resolved lines are read as they are. Totals are
//! grouped per `YYYY-MM` period and written to a trailing `# Summary:` block.

pub mod core {
    use chrono::{Duration, NaiveTime};
    use indexmap::IndexMap;
    use serde::Serialize;
    use std::{borrow::Borrow, fmt};

    /* ------------------------------ Markers ------------------------------ */

    /// Tokens that make up the log vocabulary.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Markers {
        /// Prefix of the line that opens the summary section.
        pub summary: String,
        /// Header written when the summary is regenerated.
        pub summary_header: String,
        /// Prefix of a date header line.
        pub date: String,
        /// Label that starts every hours line.
        pub hours: String,
        /// Placeholder right after `hours` on unresolved lines.
        pub placeholder: char,
    }

    impl Default for Markers {
        fn default() -> Self {
            Self {
                summary: "# Summary".to_string(),
                summary_header: "# Summary:".to_string(),
                date: "## Date: ".to_string(),
                hours: "Hours: ".to_string(),
                placeholder: '?',
            }
        }
    }

    /* ----------------------------- Period key ----------------------------- */

    /// Aggregation bucket, the `YYYY-MM` token of a date header.
    #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
    #[serde(transparent)]
    pub struct PeriodKey(pub String);

    impl PeriodKey {
        pub fn as_str(&self) -> &str {
            &self.0
        }
    }

    impl Borrow<str> for PeriodKey {
        fn borrow(&self) -> &str {
            &self.0
        }
    }

    impl fmt::Display for PeriodKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    /* ---------------------------- Time values ---------------------------- */

    /// One worked interval within a single day.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TimeSegment {
        pub start: NaiveTime,
        pub end: NaiveTime,
    }

    impl TimeSegment {
        /// `end - start`; negative when the range runs backwards.
        pub fn duration(&self) -> Duration {
            self.end - self.start
        }
    }

    /// Total time of one hours entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    pub struct WorkedTime(Duration);

    impl WorkedTime {
        pub fn from_segments<'a, I>(segments: I) -> Self
        where
            I: IntoIterator<Item = &'a TimeSegment>,
        {
            Self(
                segments
                    .into_iter()
                    .fold(Duration::zero(), |acc, seg| acc + seg.duration()),
            )
        }

        pub fn duration(&self) -> Duration {
            self.0
        }

        pub fn is_negative(&self) -> bool {
            self.0 < Duration::zero()
        }

        /// Whole hours plus minutes / 60. Seconds are dropped, which keeps the
        /// figures identical to those already written in existing logs.
        pub fn decimal_hours(&self) -> f64 {
            let hours = self.0.num_hours();
            let minutes = self.0.num_minutes() % 60;
            hours as f64 + minutes as f64 / 60.0
        }
    }

    /// `H:MM:SS`, hours unbounded.
    impl fmt::Display for WorkedTime {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let secs = self.0.num_seconds();
            let sign = if secs < 0 { "-" } else { "" };
            let secs = secs.abs();
            write!(
                f,
                "{}{}:{:02}:{:02}",
                sign,
                secs / 3600,
                (secs / 60) % 60,
                secs % 60
            )
        }
    }

    /* ---------------------------- Accumulator ---------------------------- */

    /// Hours per period, in order of first appearance.
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    #[serde(transparent)]
    pub struct PeriodTotals(IndexMap<PeriodKey, f64>);

    impl PeriodTotals {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add(&mut self, period: &PeriodKey, hours: f64) {
            *self.0.entry(period.clone()).or_insert(0.0) += hours;
        }

        pub fn get(&self, period: &str) -> Option<f64> {
            self.0.get(period).copied()
        }

        pub fn iter(&self) -> impl Iterator<Item = (&PeriodKey, f64)> {
            self.0.iter().map(|(k, v)| (k, *v))
        }

        pub fn len(&self) -> usize {
            self.0.len()
        }

        pub fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn seg(start: (u32, u32), end: (u32, u32)) -> TimeSegment {
            TimeSegment {
                start: NaiveTime::from_hms_opt(start.0, start.1, 0).expect("start"),
                end: NaiveTime::from_hms_opt(end.0, end.1, 0).expect("end"),
            }
        }

        #[test]
        fn worked_time_sums_segments_in_any_order() {
            let a = seg((16, 0), (16, 20));
            let b = seg((19, 0), (20, 30));
            let forward = WorkedTime::from_segments(&[a, b]);
            let backward = WorkedTime::from_segments(&[b, a]);
            assert_eq!(forward, backward);
            assert_eq!(forward.to_string(), "1:50:00");
            assert_ne!(forward.to_string(), "1:50");
        }

        #[test]
        fn decimal_hours_uses_hours_and_minutes() {
            let worked = WorkedTime::from_segments(&[seg((17, 10), (19, 30))]);
            assert_eq!(format!("{:.2}", worked.decimal_hours()), "2.33");

            let with_seconds = WorkedTime(Duration::seconds(3600 + 30 * 60 + 59));
            assert_eq!(with_seconds.decimal_hours(), 1.5);
            assert_eq!(with_seconds.to_string(), "1:30:59");
        }

        #[test]
        fn worked_time_past_a_day_keeps_counting_hours() {
            let worked = WorkedTime(Duration::minutes(26 * 60 + 5));
            assert_eq!(worked.to_string(), "26:05:00");
        }

        #[test]
        fn backwards_segment_is_negative() {
            let worked = WorkedTime::from_segments(&[seg((20, 0), (19, 30))]);
            assert!(worked.is_negative());
            assert_eq!(worked.to_string(), "-0:30:00");
        }

        #[test]
        fn totals_keep_first_seen_order() {
            let mut totals = PeriodTotals::new();
            let feb = PeriodKey("2014-02".into());
            let jan = PeriodKey("2014-01".into());
            totals.add(&feb, 0.78);
            totals.add(&jan, 0.63);
            totals.add(&feb, 1.0);

            let keys: Vec<&str> = totals.iter().map(|(k, _)| k.as_str()).collect();
            assert_eq!(keys, vec!["2014-02", "2014-01"]);
            assert_eq!(totals.get("2014-02"), Some(0.78 + 1.0));
            assert_eq!(totals.get("2013-12"), None);
        }
    }
}

pub mod parser {
    //! Line grammar built on `nom`.
    //!
    //! The scan is line-oriented: `classify` picks the kind of each line from
    //! its prefix, the combinators below pull the values out of it.

    use crate::core::{Markers, PeriodKey, TimeSegment};
    use chrono::NaiveTime;
    use nom::{
        IResult,
        branch::alt,
        bytes::complete::{take_while, take_while_m_n, take_while1},
        character::complete::{char, one_of},
        combinator::{map, map_res, peek, recognize},
        error::VerboseError,
        sequence::{delimited, preceded, separated_pair, terminated, tuple},
    };

    type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

    /* --------------------------- Classification --------------------------- */

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LineKind {
        SummaryMarker,
        DateHeader,
        UnresolvedHours,
        CalculatedHours,
        Other,
    }

    /// Kind of `line`, checked in priority order.
    pub fn classify(line: &str, markers: &Markers) -> LineKind {
        if line.starts_with(&markers.summary) {
            LineKind::SummaryMarker
        } else if line.starts_with(&markers.date) {
            LineKind::DateHeader
        } else if let Some(rest) = line.strip_prefix(&markers.hours) {
            if rest.starts_with(markers.placeholder) {
                LineKind::UnresolvedHours
            } else {
                LineKind::CalculatedHours
            }
        } else {
            LineKind::Other
        }
    }

    /* ----------------------------- Date header ----------------------------- */

    /// First `YYYY-MM` token on the line.
    pub fn period_key(line: &str) -> Option<PeriodKey> {
        find_first(line, year_month).map(|s| PeriodKey(s.to_string()))
    }

    fn year_month(i: &str) -> PResult<'_, &str> {
        recognize(tuple((
            take_while_m_n(4, 4, is_digit),
            char('-'),
            take_while_m_n(2, 2, is_digit),
        )))(i)
    }

    /* ---------------------------- Time segments ---------------------------- */

    /// Contents of the first `( ... )` or `{ ... }` group made only of
    /// segment characters.
    pub fn segment_group(line: &str) -> Option<&str> {
        find_first(line, delimited_group)
    }

    fn delimited_group(i: &str) -> PResult<'_, &str> {
        alt((
            delimited(char('('), take_while(is_group_char), char(')')),
            delimited(char('{'), take_while(is_group_char), char('}')),
        ))(i)
    }

    fn is_group_char(c: char) -> bool {
        c.is_ascii_digit() || matches!(c, '-' | '+' | ':' | ' ')
    }

    /// Splits a group on `+` and takes the first `HH:MM-HH:MM` of each piece.
    /// Anything else in a piece is ignored; a piece with no range is an error.
    pub fn parse_segments(group: &str) -> Result<Vec<TimeSegment>, String> {
        group
            .split('+')
            .map(|raw| {
                find_first(raw, segment)
                    .ok_or_else(|| format!("malformed time segment {:?}", raw.trim()))
            })
            .collect()
    }

    fn segment(i: &str) -> PResult<'_, TimeSegment> {
        map(separated_pair(clock, char('-'), clock), |(start, end)| {
            TimeSegment { start, end }
        })(i)
    }

    fn clock(i: &str) -> PResult<'_, NaiveTime> {
        map_res(
            separated_pair(two_digits("012"), char(':'), two_digits("012345")),
            |(h, m)| NaiveTime::from_hms_opt(h, m, 0).ok_or("clock time outside the day"),
        )(i)
    }

    fn two_digits(first: &'static str) -> impl Fn(&str) -> PResult<'_, u32> {
        move |i: &str| {
            map_res(
                recognize(tuple((one_of(first), take_while_m_n(1, 1, is_digit)))),
                |s: &str| s.parse::<u32>(),
            )(i)
        }
    }

    /* --------------------------- Calculated hours --------------------------- */

    /// Decimal figure of the first `[<number>` followed by a space, `h` or `]`.
    pub fn calculated_hours(line: &str) -> Option<f64> {
        find_first(line, bracketed_hours)
    }

    fn bracketed_hours(i: &str) -> PResult<'_, f64> {
        map_res(
            terminated(
                preceded(char('['), take_while1(|c: char| c.is_ascii_digit() || c == '.')),
                peek(one_of(" h]")),
            ),
            |s: &str| s.parse::<f64>(),
        )(i)
    }

    /* ------------------------------- Utils ------------------------------- */

    /// Runs `parser` at every char boundary and keeps the first success.
    fn find_first<'a, T>(line: &'a str, parser: impl Fn(&'a str) -> PResult<'a, T>) -> Option<T> {
        line.char_indices()
            .find_map(|(idx, _)| parser(&line[idx..]).ok().map(|(_, out)| out))
    }

    fn is_digit(c: char) -> bool {
        c.is_ascii_digit()
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn classifies_by_prefix() {
            let m = Markers::default();
            assert_eq!(classify("# Summary:\n", &m), LineKind::SummaryMarker);
            assert_eq!(classify("## Date: 2014-01-17\n", &m), LineKind::DateHeader);
            assert_eq!(
                classify("Hours: ? (17:10-19:30)\n", &m),
                LineKind::UnresolvedHours
            );
            assert_eq!(
                classify("Hours: 2:20:00 [2.33 h] (17:10-19:30)\n", &m),
                LineKind::CalculatedHours
            );
            assert_eq!(classify("- Editing video\n", &m), LineKind::Other);
            assert_eq!(classify("# Actions:\n", &m), LineKind::Other);
        }

        #[test]
        fn period_key_is_year_and_month() {
            let key = period_key("## Date: 2013-08-10\n").expect("period");
            assert_eq!(key.as_str(), "2013-08");
            assert_ne!(key.as_str(), "2013-08-10");
        }

        #[test]
        fn period_key_rejects_other_shapes() {
            assert_eq!(period_key("## Date: 13-08-10\n"), None);
            assert_eq!(period_key("## Date: 2013/08/10\n"), None);
            assert_eq!(period_key("## Date: tomorrow\n"), None);
        }

        #[test]
        fn segment_group_accepts_parens_and_braces() {
            assert_eq!(
                segment_group("Hours: ? (16:00-16:20 + 19:00-20:30)\n"),
                Some("16:00-16:20 + 19:00-20:30")
            );
            assert_eq!(
                segment_group("Hours: ? {16:00-16:20}\n"),
                Some("16:00-16:20")
            );
            assert_eq!(segment_group("Hours: ? (see notes) (08:00-09:00)"), Some("08:00-09:00"));
            assert_eq!(segment_group("Hours: ? 16:00-16:20\n"), None);
        }

        #[test]
        fn parses_each_segment() {
            let segments = parse_segments("16:00-16:20 + 19:00-20:30").expect("segments");
            assert_eq!(segments.len(), 2);
            assert_eq!(segments[0].start, NaiveTime::from_hms_opt(16, 0, 0).unwrap());
            assert_eq!(segments[1].end, NaiveTime::from_hms_opt(20, 30, 0).unwrap());
        }

        #[test]
        fn rejects_malformed_segments() {
            assert!(parse_segments("").is_err());
            assert!(parse_segments("16:00-16:20 + ").is_err());
            assert!(parse_segments("16:00 16:20").is_err());
            assert!(parse_segments("16:60-17:00").is_err());
            assert!(parse_segments("31:00-32:00").is_err());
            // Accepted by the digit pattern but not a clock time.
            assert!(parse_segments("24:00-25:00").is_err());
        }

        #[test]
        fn takes_first_range_of_each_piece() {
            let segments =
                parse_segments("16:18-16:38 + 16:41-16:59 - 19:00-19:20").expect("segments");
            assert_eq!(segments.len(), 2);
            assert_eq!(segments[1].start, NaiveTime::from_hms_opt(16, 41, 0).unwrap());
            assert_eq!(segments[1].end, NaiveTime::from_hms_opt(16, 59, 0).unwrap());
        }

        #[test]
        fn reads_calculated_hours() {
            let line = "Hours: 1:50:00 [1.83 h] (16:00-16:20 + 19:00-20:30)\n";
            assert_eq!(calculated_hours(line), Some(1.83));
            assert_ne!(calculated_hours(line), Some(1.833));
            assert_eq!(calculated_hours("Hours: 2:00:00 [2]\n"), Some(2.0));
            assert_eq!(calculated_hours("Hours: 2:00:00 [2h]\n"), Some(2.0));
        }

        #[test]
        fn calculated_hours_needs_a_number() {
            assert_eq!(calculated_hours("Hours: 1:50:00 (16:00-17:50)\n"), None);
            assert_eq!(calculated_hours("Hours: [] h\n"), None);
            assert_eq!(calculated_hours("Hours: [1.83)\n"), None);
        }
    }
}

pub mod format {
    use crate::core::{Markers, PeriodKey, PeriodTotals};
    use tracing::info;

    /// `- <period> = <hours> h`, newline terminated.
    pub fn summary_line(period: &PeriodKey, hours: f64) -> String {
        format!("- {}\n", summary_text(period, hours))
    }

    fn summary_text(period: &PeriodKey, hours: f64) -> String {
        format!("{} = {:.2} h", period, hours)
    }

    /// Header plus one line per period, in first-seen order.
    pub fn render_summary(markers: &Markers, totals: &PeriodTotals) -> Vec<String> {
        let mut out = Vec::with_capacity(totals.len() + 1);
        out.push(format!("{}\n", markers.summary_header));
        for (period, hours) in totals.iter() {
            info!("{}", summary_text(period, hours));
            out.push(summary_line(period, hours));
        }
        out
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn renders_header_and_periods() {
            let mut totals = PeriodTotals::new();
            totals.add(&PeriodKey("2014-02".into()), 0.78);
            totals.add(&PeriodKey("2014-01".into()), 2.33);
            totals.add(&PeriodKey("2014-01".into()), 0.63);

            let lines = render_summary(&Markers::default(), &totals);
            assert_eq!(
                lines,
                vec![
                    "# Summary:\n".to_string(),
                    "- 2014-02 = 0.78 h\n".to_string(),
                    "- 2014-01 = 2.96 h\n".to_string(),
                ]
            );
        }

        #[test]
        fn empty_totals_still_emit_header() {
            let totals = PeriodTotals::new();
            assert!(totals.is_empty());
            let lines = render_summary(&Markers::default(), &totals);
            assert_eq!(lines, vec!["# Summary:\n".to_string()]);
        }
    }
}

pub mod processor {
    //! One pass over a work log: resolve `Hours: ?` lines, sum every period,
    //! replace the summary.

    use crate::core::{Markers, PeriodKey, PeriodTotals, WorkedTime};
    use crate::format::render_summary;
    use crate::parser::{self, LineKind};
    use serde::Serialize;
    use thiserror::Error;
    use tracing::{debug, info};

    /// A malformed line. Any of these aborts the whole pass.
    #[derive(Debug, Error, PartialEq)]
    pub enum ProcessError {
        #[error("line {line_no}: malformed unresolved hours entry ({reason}): {line:?}")]
        UnresolvedEntry {
            line_no: usize,
            line: String,
            reason: String,
        },
        #[error("line {line_no}: calculated hours entry has no [<hours> h] figure: {line:?}")]
        CalculatedEntry { line_no: usize, line: String },
        #[error("line {line_no}: date header has no YYYY-MM period: {line:?}")]
        DateHeader { line_no: usize, line: String },
        #[error("line {line_no}: hours entry appears before any date header: {line:?}")]
        MissingPeriod { line_no: usize, line: String },
    }

    impl ProcessError {
        pub fn line_no(&self) -> usize {
            match self {
                ProcessError::UnresolvedEntry { line_no, .. }
                | ProcessError::CalculatedEntry { line_no, .. }
                | ProcessError::DateHeader { line_no, .. }
                | ProcessError::MissingPeriod { line_no, .. } => *line_no,
            }
        }
    }

    /// Result of one pass.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ProcessedLog {
        pub lines: Vec<String>,
        pub totals: PeriodTotals,
        modified_lines: usize,
    }

    impl ProcessedLog {
        pub fn has_changed(&self) -> bool {
            debug!("There are {} modified lines", self.modified_lines);
            self.modified_lines > 0
        }

        pub fn modified_lines(&self) -> usize {
            self.modified_lines
        }

        pub fn into_lines(self) -> Vec<String> {
            self.lines
        }

        pub fn report(&self) -> SummaryReport<'_> {
            SummaryReport {
                changed: self.modified_lines > 0,
                modified_lines: self.modified_lines,
                totals: &self.totals,
            }
        }
    }

    /// Serializable view for `--json`.
    #[derive(Debug, Serialize)]
    pub struct SummaryReport<'a> {
        pub changed: bool,
        pub modified_lines: usize,
        pub totals: &'a PeriodTotals,
    }

    /// An unresolved line after substitution.
    #[derive(Debug, Clone, PartialEq)]
    pub struct ResolvedEntry {
        pub line: String,
        pub worked: WorkedTime,
        /// Hours as written into the line, rounded to two decimals.
        pub hours: f64,
    }

    #[derive(Debug, Clone, Default)]
    pub struct LogProcessor {
        markers: Markers,
    }

    impl LogProcessor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_markers(markers: Markers) -> Self {
            Self { markers }
        }

        pub fn process<S: AsRef<str>>(&self, lines: &[S]) -> Result<ProcessedLog, ProcessError> {
            debug!("Processing {} lines", lines.len());

            let mut out = Vec::with_capacity(lines.len() + 8);
            let mut totals = PeriodTotals::new();
            let mut current: Option<PeriodKey> = None;
            let mut modified_lines = 0;

            for (idx, line) in lines.iter().enumerate() {
                let line = line.as_ref();
                let line_no = idx + 1;
                match parser::classify(line, &self.markers) {
                    LineKind::SummaryMarker => break,
                    LineKind::DateHeader => {
                        let period = parser::period_key(line).ok_or_else(|| {
                            ProcessError::DateHeader {
                                line_no,
                                line: display_line(line),
                            }
                        })?;
                        debug!("Period {}", period);
                        current = Some(period);
                        out.push(line.to_string());
                    }
                    LineKind::UnresolvedHours => {
                        let period = require_period(&current, line_no, line)?;
                        let entry = self.resolve_entry(line).map_err(|reason| {
                            ProcessError::UnresolvedEntry {
                                line_no,
                                line: display_line(line),
                                reason,
                            }
                        })?;
                        info!("Added {:.2} Hours", entry.hours);
                        totals.add(period, entry.hours);
                        modified_lines += 1;
                        out.push(entry.line);
                    }
                    LineKind::CalculatedHours => {
                        let period = require_period(&current, line_no, line)?;
                        let hours = parser::calculated_hours(line).ok_or_else(|| {
                            ProcessError::CalculatedEntry {
                                line_no,
                                line: display_line(line),
                            }
                        })?;
                        debug!("Found: {}", hours);
                        info!("There were already {:.2} hours", hours);
                        totals.add(period, hours);
                        out.push(line.to_string());
                    }
                    LineKind::Other => out.push(line.to_string()),
                }
            }

            out.extend(render_summary(&self.markers, &totals));

            Ok(ProcessedLog {
                lines: out,
                totals,
                modified_lines,
            })
        }

        /// Sums the segments of an unresolved line and splices
        /// `<H:MM:SS> [<hours> h]` in place of the placeholder.
        pub fn resolve_entry(&self, line: &str) -> Result<ResolvedEntry, String> {
            let rest = line
                .strip_prefix(self.markers.hours.as_str())
                .and_then(|r| r.strip_prefix(self.markers.placeholder))
                .ok_or_else(|| {
                    format!(
                        "expected {:?} followed by {:?}",
                        self.markers.hours, self.markers.placeholder
                    )
                })?;
            let group = parser::segment_group(line)
                .ok_or_else(|| "no parenthesized time segments".to_string())?;
            let segments = parser::parse_segments(group)?;
            debug!("Found: {:?}", group.split('+').map(str::trim).collect::<Vec<_>>());
            for seg in &segments {
                debug!(
                    "\tStart: {}\tEnd: {}\tDifference: {}",
                    seg.start.format("%H:%M"),
                    seg.end.format("%H:%M"),
                    WorkedTime::from_segments([seg])
                );
            }

            let worked = WorkedTime::from_segments(&segments);
            if worked.is_negative() {
                return Err(format!("segments add up to a negative time {worked}"));
            }

            let figure = format!("{:.2}", worked.decimal_hours());
            // Totals add the figure as written into the line.
            let hours = figure
                .parse::<f64>()
                .map_err(|err| format!("unreadable hours figure {figure:?}: {err}"))?;

            let line = format!("{}{} [{} h]{}", self.markers.hours, worked, figure, rest);

            Ok(ResolvedEntry {
                line,
                worked,
                hours,
            })
        }
    }

    fn require_period<'a>(
        current: &'a Option<PeriodKey>,
        line_no: usize,
        line: &str,
    ) -> Result<&'a PeriodKey, ProcessError> {
        current.as_ref().ok_or_else(|| ProcessError::MissingPeriod {
            line_no,
            line: display_line(line),
        })
    }

    fn display_line(line: &str) -> String {
        line.trim_end_matches(['\n', '\r']).to_string()
    }

}

pub mod storage {
    //! Loading and saving the log file, with a numbered backup of the
    //! previous version taken before every write.

    use anyhow::{Context, Result, bail};
    use std::{
        fs,
        path::{Path, PathBuf},
    };
    use tracing::debug;

    pub trait LogStore {
        /// Lines of the document, terminators kept.
        fn load(&self) -> Result<Vec<String>>;

        /// Moves the current file into the backup location, then writes
        /// `lines`. Returns the backup path.
        fn save(&self, lines: &[String]) -> Result<PathBuf>;
    }

    #[derive(Debug, Clone)]
    pub struct FileLogStore {
        file_path: PathBuf,
        backup_dir: PathBuf,
    }

    impl FileLogStore {
        /// Both paths must already exist.
        pub fn open(file_path: impl AsRef<Path>, backup_dir: impl AsRef<Path>) -> Result<Self> {
            let file_path = std::path::absolute(file_path.as_ref())
                .with_context(|| format!("resolving path {:?}", file_path.as_ref()))?;
            if !file_path.is_file() {
                bail!("file {} not found", file_path.display());
            }
            debug!("Working with Markdown file {}", file_path.display());

            let backup_dir = std::path::absolute(backup_dir.as_ref())
                .with_context(|| format!("resolving path {:?}", backup_dir.as_ref()))?;
            if !backup_dir.is_dir() {
                bail!("backup folder {} not found", backup_dir.display());
            }
            debug!("Working with backup folder {}", backup_dir.display());

            Ok(Self {
                file_path,
                backup_dir,
            })
        }

        pub fn file_path(&self) -> &Path {
            &self.file_path
        }

        /// `<backup_dir>/<stem>-NNN<.ext>` with the lowest free counter.
        pub fn next_backup_path(&self) -> PathBuf {
            let stem = self
                .file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let ext = self
                .file_path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_default();
            (0u32..)
                .map(|n| self.backup_dir.join(format!("{stem}-{n:03}{ext}")))
                .find(|candidate| !candidate.exists())
                .unwrap_or_else(|| self.backup_dir.join(format!("{stem}{ext}")))
        }

        fn backup(&self) -> Result<PathBuf> {
            let target = self.next_backup_path();
            if fs::rename(&self.file_path, &target).is_err() {
                // rename fails across filesystems
                fs::copy(&self.file_path, &target).with_context(|| {
                    format!("copying {:?} to {:?}", self.file_path, target)
                })?;
                fs::remove_file(&self.file_path)
                    .with_context(|| format!("removing {:?}", self.file_path))?;
            }
            debug!("Created backup file {}", target.display());
            Ok(target)
        }
    }

    impl LogStore for FileLogStore {
        fn load(&self) -> Result<Vec<String>> {
            let text = fs::read_to_string(&self.file_path)
                .with_context(|| format!("reading {:?}", self.file_path))?;
            Ok(split_lines(&text))
        }

        fn save(&self, lines: &[String]) -> Result<PathBuf> {
            let backup = self.backup()?;
            fs::write(&self.file_path, lines.concat().as_bytes())
                .with_context(|| format!("writing {:?}", self.file_path))?;
            debug!("Updated file {}", self.file_path.display());
            Ok(backup)
        }
    }

    /// Splits after every `\n`, keeping it.
    pub fn split_lines(text: &str) -> Vec<String> {
        text.split_inclusive('\n').map(str::to_string).collect()
    }

}

pub use crate::core::{Markers, PeriodKey, PeriodTotals, TimeSegment, WorkedTime};
pub use crate::processor::{LogProcessor, ProcessError, ProcessedLog};
pub use crate::storage::{FileLogStore, LogStore};
