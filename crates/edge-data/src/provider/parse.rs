//! 경제 캘린더 HTML 파싱.
//!
//! ## 페이지 구조
//! 모바일 경제 캘린더는 이벤트 하나를 `<tr>` 한 줄로 보여줍니다.
//!
//! ```html
//! <tr data-event-datetime="2024/05/15 12:30:00">
//!   <td>08:30</td><td>CPI (YoY) (Apr)</td><td>3.4%</td><td>3.4%</td><td>3.5%</td>
//! </tr>
//! ```
//!
//! 열 순서: `[시각, 이벤트명, 발표치, 예측치, 이전치]`. 이전치 열은 없을 수 있습니다.
//!
//! 키워드와 맞는 행이 없으면 원문에서 키워드 뒤 400바이트를 잘라
//! 퍼센트 값을 최대 세 개(발표치, 예측치, 이전치) 읽습니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use edge_core::{Reading, Unit};
use scraper::{Html, Selector};

/// 키워드 뒤에서 값을 찾는 구간 길이 (바이트).
const FALLBACK_BLOCK_LEN: usize = 400;

/// 행 속성의 발표 시각 형식.
const EVENT_DATETIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// 캘린더 한 행.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarRow {
    /// 이벤트명
    pub name: String,
    /// 발표치 셀 원문
    pub actual: String,
    /// 예측치 셀 원문
    pub forecast: String,
    /// 이전치 셀 원문
    pub previous: Option<String>,
    /// 발표 시각
    pub released_at: Option<DateTime<Utc>>,
}

/// 지표 하나를 찾은 결과.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub reading: Reading,
    pub released_at: Option<DateTime<Utc>>,
}

/// 파싱된 캘린더 페이지.
///
/// `scraper::Html`은 `Send`가 아니므로 파싱 직후 필요한 값만 뽑아 보관합니다.
#[derive(Debug, Clone)]
pub struct CalendarPage {
    rows: Vec<CalendarRow>,
    lowered: String,
}

impl CalendarPage {
    /// HTML 문서를 파싱합니다.
    pub fn parse(html: &str) -> Self {
        Self {
            rows: parse_rows(html),
            lowered: html.to_ascii_lowercase(),
        }
    }

    pub fn rows(&self) -> &[CalendarRow] {
        &self.rows
    }

    /// 키워드로 지표를 찾아 값을 읽습니다.
    ///
    /// 키워드와 맞는 행이 없으면 원문 텍스트에서 찾습니다.
    /// 실패하면 PARSE_ERROR 사유를 돌려줍니다.
    pub fn locate(&self, keywords: &[String], unit: Unit) -> Result<Located, String> {
        let Some(row) = self.rows.iter().find(|row| {
            let name = row.name.to_lowercase();
            keywords.iter().any(|k| name.contains(k.as_str()))
        }) else {
            return self.locate_in_text(keywords, unit);
        };

        let actual = extract_value(&row.actual, unit).ok_or_else(|| {
            format!("actual value {:?} of '{}' is not a number", row.actual, row.name)
        })?;

        let mut reading = Reading::new(actual, unit);
        reading.forecast = extract_value(&row.forecast, unit);
        reading.previous = row.previous.as_deref().and_then(|p| extract_value(p, unit));

        Ok(Located {
            reading,
            released_at: row.released_at,
        })
    }

    /// 원문 텍스트 대체 경로.
    fn locate_in_text(&self, keywords: &[String], unit: Unit) -> Result<Located, String> {
        for keyword in keywords {
            let Some(pos) = self.lowered.find(keyword.as_str()) else {
                continue;
            };

            let start = pos + keyword.len();
            let mut end = (start + FALLBACK_BLOCK_LEN).min(self.lowered.len());
            while !self.lowered.is_char_boundary(end) {
                end -= 1;
            }

            let percents: Vec<f64> = scan_numbers(&self.lowered[start..end])
                .into_iter()
                .filter(|n| n.percent)
                .map(|n| n.value)
                .take(3)
                .collect();

            if let Some(&actual) = percents.first() {
                let mut reading = Reading::new(actual, unit);
                reading.forecast = percents.get(1).copied();
                reading.previous = percents.get(2).copied();
                return Ok(Located {
                    reading,
                    released_at: None,
                });
            }
        }

        Err(format!(
            "no calendar row matches {:?} and no percentage follows it in the page text",
            keywords
        ))
    }
}

/// `<td>`가 4개 이상인 `<tr>`을 캘린더 행으로 읽습니다.
fn parse_rows(html: &str) -> Vec<CalendarRow> {
    let document = Html::parse_document(html);
    let (Ok(tr_selector), Ok(td_selector)) = (Selector::parse("tr"), Selector::parse("td")) else {
        return Vec::new();
    };

    document
        .select(&tr_selector)
        .filter_map(|tr| {
            let cells: Vec<String> = tr
                .select(&td_selector)
                .map(|td| collapse_whitespace(&td.text().collect::<String>()))
                .collect();
            if cells.len() < 4 {
                return None;
            }

            let released_at = tr
                .value()
                .attr("data-event-datetime")
                .and_then(|s| NaiveDateTime::parse_from_str(s.trim(), EVENT_DATETIME_FORMAT).ok())
                .map(|naive| naive.and_utc());

            Some(CalendarRow {
                name: cells[1].clone(),
                actual: cells[2].clone(),
                forecast: cells[3].clone(),
                previous: cells.get(4).cloned(),
                released_at,
            })
        })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 셀에서 값을 읽습니다.
///
/// - `Percent`: `%`가 붙은 첫 숫자
/// - `Index`: 첫 숫자
pub fn extract_value(text: &str, unit: Unit) -> Option<f64> {
    let numbers = scan_numbers(text);
    match unit {
        Unit::Percent => numbers.into_iter().find(|n| n.percent).map(|n| n.value),
        Unit::Index => numbers.first().map(|n| n.value),
    }
}

/// 텍스트에서 찾은 숫자.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberToken {
    pub value: f64,
    /// 바로 뒤(공백 허용)에 `%`가 있는지
    pub percent: bool,
}

/// 부호, 천 단위 쉼표, 소수점을 허용하는 숫자를 모두 찾습니다.
pub fn scan_numbers(text: &str) -> Vec<NumberToken> {
    let text = text.replace('\u{2212}', "-");
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let start = i;
        let mut j = i;
        if bytes[j] == b'-' || bytes[j] == b'+' {
            j += 1;
        }

        let digits_start = j;
        while j < len
            && (bytes[j].is_ascii_digit()
                || (bytes[j] == b','
                    && j > digits_start
                    && j + 1 < len
                    && bytes[j + 1].is_ascii_digit()))
        {
            j += 1;
        }
        if j == digits_start {
            i += 1;
            continue;
        }

        if j + 1 < len && bytes[j] == b'.' && bytes[j + 1].is_ascii_digit() {
            j += 1;
            while j < len && bytes[j].is_ascii_digit() {
                j += 1;
            }
        }

        let literal: String = text[start..j].chars().filter(|c| *c != ',').collect();
        if let Ok(value) = literal.parse::<f64>() {
            let mut k = j;
            while k < len && bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            tokens.push(NumberToken {
                value,
                percent: k < len && bytes[k] == b'%',
            });
        }
        i = j;
    }

    tokens
}
