//! Scraping provider for the esuds room-status pages.
//!
//! The upstream serves a table of machines as semi-structured markup. The
//! page is first stripped of noise (doctype, xmlns declarations, inline
//! scripts, `&nbsp;` entities) with one combined pattern, then streamed
//! through a tolerant tag-walker — never a full DOM. Data rows are `<tr>`
//! elements whose class is `even` or `odd`, each carrying five cells in
//! fixed order: id, number, type, status, time remaining.

use std::borrow::Cow;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use super::backend::Backend;
use super::error::ProviderError;
use super::StatusProvider;
use crate::model::{Machine, MachineStatus, MachineType, RoomId};

/// Noise removed before the markup is scanned. One combined alternation so
/// the page is cleaned in a single pass.
static NOISE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)xmlns="[^"]*"|<!DOCTYPE[^>]*>|<script[^>]*>.*?</script>|&nbsp;"#)
        .expect("noise pattern must compile")
});

/// Row classes that mark a machine data row.
const DATA_ROW_CLASSES: [&str; 2] = ["even", "odd"];

pub fn strip_noise(html: &str) -> Cow<'_, str> {
    NOISE_PATTERN.replace_all(html, "")
}

/// Parse a cleaned or raw status page into the room's machine set.
///
/// Per-cell problems (non-numeric ids, unrecognized labels) degrade to
/// sentinel values; a document whose row/cell structure is broken fails the
/// whole parse with [`ProviderError::Markup`].
pub fn parse_status_page(room_id: RoomId, html: &str) -> Result<Vec<Machine>, ProviderError> {
    let cleaned = strip_noise(html);
    let mut reader = tolerant_reader(&cleaned);
    let mut machines = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.local_name().as_ref() == b"tr" => {
                if is_data_row(&tag) {
                    machines.push(read_machine_row(room_id, &mut reader)?);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(error) => return Err(ProviderError::Markup(error.to_string())),
        }
    }

    Ok(machines)
}

fn tolerant_reader(markup: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(markup);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.trim_text_start = true;
    config.trim_text_end = true;
    reader
}

fn is_data_row(tag: &BytesStart<'_>) -> bool {
    attribute_value(tag, b"class")
        .map(|class| DATA_ROW_CLASSES.contains(&class.as_str()))
        .unwrap_or(false)
}

fn attribute_value(tag: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    tag.attributes()
        .with_checks(false)
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name)
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

fn text_of(text: &BytesText<'_>) -> String {
    match text.unescape() {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => String::from_utf8_lossy(text.as_ref()).into_owned(),
    }
}

/// Content of one `<td>` cell: its flattened text plus the `value` of any
/// nested `<input>` element.
#[derive(Debug, Default)]
struct Cell {
    text: String,
    input_value: Option<String>,
}

/// Advance to the next `<td>` of the current row and collect its content.
///
/// Running out of row (or document) before the cell is found is a structural
/// error: the page no longer looks like a machine table.
fn next_cell(reader: &mut Reader<&[u8]>) -> Result<Cell, ProviderError> {
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.local_name().as_ref() == b"td" => break,
            Ok(Event::Empty(tag)) if tag.local_name().as_ref() == b"td" => {
                return Ok(Cell::default());
            }
            Ok(Event::End(tag)) if tag.local_name().as_ref() == b"tr" => {
                return Err(ProviderError::Markup(
                    "machine row ended before its expected cell".into(),
                ));
            }
            Ok(Event::Eof) => {
                return Err(ProviderError::Markup(
                    "document ended inside a machine row".into(),
                ));
            }
            Ok(_) => {}
            Err(error) => return Err(ProviderError::Markup(error.to_string())),
        }
    }

    let mut cell = Cell::default();
    loop {
        match reader.read_event() {
            Ok(Event::Text(text)) => cell.text.push_str(&text_of(&text)),
            Ok(Event::Start(tag)) | Ok(Event::Empty(tag))
                if tag.local_name().as_ref() == b"input" =>
            {
                if let Some(value) = attribute_value(&tag, b"value") {
                    cell.input_value = Some(value);
                }
            }
            Ok(Event::End(tag)) if tag.local_name().as_ref() == b"td" => break,
            Ok(Event::End(tag)) if tag.local_name().as_ref() == b"tr" => {
                return Err(ProviderError::Markup("machine cell never closed".into()));
            }
            Ok(Event::Eof) => {
                return Err(ProviderError::Markup(
                    "document ended inside a machine cell".into(),
                ));
            }
            Ok(_) => {}
            Err(error) => return Err(ProviderError::Markup(error.to_string())),
        }
    }

    Ok(cell)
}

fn read_machine_row(room_id: RoomId, reader: &mut Reader<&[u8]>) -> Result<Machine, ProviderError> {
    let id_cell = next_cell(reader)?;
    let number_cell = next_cell(reader)?;
    let type_cell = next_cell(reader)?;
    let status_cell = next_cell(reader)?;
    let time_cell = next_cell(reader)?;

    let mut machine = Machine::new(
        room_id,
        MachineType::from_label(&type_cell.text),
        number_cell.text.trim().parse().unwrap_or(-1),
    );
    machine.external_id = id_cell
        .input_value
        .as_deref()
        .and_then(|value| value.trim().parse().ok());
    machine.status =
        MachineStatus::parse_report(&status_cell.text).unwrap_or(MachineStatus::Unknown);
    machine.time_remaining = parse_minutes(&time_cell.text);

    Ok(machine)
}

/// A time-remaining cell is a decimal number of minutes; anything else means
/// the machine did not report one.
fn parse_minutes(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(minutes) if minutes.is_finite() && minutes >= 0.0 => {
            Some(Duration::from_secs_f64(minutes * 60.0))
        }
        _ => {
            debug!(cell = text, "Unrecognized time remaining");
            None
        }
    }
}

/// Provider scraping the esuds room-status endpoint.
pub struct EsudsProvider {
    backend: Backend,
}

impl EsudsProvider {
    pub const DEFAULT_BASE_URL: &'static str = "http://esuds.net";
    const STATUS_PATH: &'static str = "/RoomStatus/machineStatus.i";
    const ROOM_PARAM: &'static str = "bottomLocationId";

    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            backend: Backend::new("esuds", base_url, client),
        }
    }

    fn room_url(&self, room_id: RoomId) -> String {
        format!(
            "{}{}?{}={}",
            self.backend.base_url,
            Self::STATUS_PATH,
            Self::ROOM_PARAM,
            room_id
        )
    }
}

#[async_trait]
impl StatusProvider for EsudsProvider {
    fn name(&self) -> &'static str {
        self.backend.name
    }

    async fn fetch(&self, room_id: RoomId) -> Result<Vec<Machine>, ProviderError> {
        let response = self.backend.get(&self.room_url(room_id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::BadStatus(status));
        }
        let body = response.text().await?;
        parse_status_page(room_id, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAGE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<script type="text/javascript">var marker = "<tr class=\"even\">";</script>
</head>
<body>
<table>
<tr class="tableHeader"><td>Machine</td></tr>
<tr class="even">
  <td><input type="hidden" name="machine" value="101"/></td>
  <td>1</td>
  <td>Front Load Washer</td>
  <td><font color="green">Available</font></td>
  <td>&nbsp;</td>
</tr>
<tr class="odd">
  <td><input type="hidden" name="machine" value="102"/></td>
  <td>2</td>
  <td>Dryer</td>
  <td><font color="red">In Use</font></td>
  <td>12.5</td>
</tr>
</table>
</body>
</html>"#;

    #[test]
    fn noise_stripping_removes_known_patterns() {
        let cleaned = strip_noise(SAMPLE_PAGE);
        assert!(!cleaned.contains("DOCTYPE"));
        assert!(!cleaned.contains("xmlns"));
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("&nbsp;"));
        assert!(cleaned.contains("Front Load Washer"));
    }

    #[test]
    fn parses_all_data_rows() {
        let machines = parse_status_page(42, SAMPLE_PAGE).unwrap();
        assert_eq!(machines.len(), 2);

        assert_eq!(machines[0].room_id, 42);
        assert_eq!(machines[0].external_id, Some(101));
        assert_eq!(machines[0].number, 1);
        assert_eq!(machines[0].kind, MachineType::Washer);
        assert_eq!(machines[0].status, MachineStatus::Available);
        assert_eq!(machines[0].time_remaining, None);

        assert_eq!(machines[1].external_id, Some(102));
        assert_eq!(machines[1].kind, MachineType::Dryer);
        assert_eq!(machines[1].status, MachineStatus::InUse);
        assert_eq!(machines[1].time_remaining, Some(Duration::from_secs(750)));
    }

    #[test]
    fn both_row_classes_parse_identically() {
        let row = |class: &str| {
            format!(
                r#"<table><tr class="{class}">
                    <td><input value="7"/></td><td>3</td><td>Washer</td>
                    <td><font>Cycle Complete</font></td><td>4</td>
                   </tr></table>"#
            )
        };
        let even = parse_status_page(1, &row("even")).unwrap();
        let odd = parse_status_page(1, &row("odd")).unwrap();
        assert_eq!(even, odd);
        assert_eq!(even[0].status, MachineStatus::CycleComplete);
    }

    #[test]
    fn non_data_rows_are_skipped() {
        let page = r#"<table>
            <tr class="tableHeader"><td>Id</td><td>No.</td></tr>
            <tr><td>stray</td></tr>
        </table>"#;
        assert!(parse_status_page(1, page).unwrap().is_empty());
    }

    #[test]
    fn malformed_cells_degrade_to_sentinels() {
        let page = r#"<table><tr class="even">
            <td><input value="not-a-number"/></td>
            <td>eight</td>
            <td>Mangle</td>
            <td><font>Broken</font></td>
            <td>soon</td>
        </tr></table>"#;
        let machines = parse_status_page(9, page).unwrap();
        assert_eq!(machines.len(), 1);
        assert_eq!(machines[0].external_id, None);
        assert_eq!(machines[0].number, -1);
        assert_eq!(machines[0].kind, MachineType::Unknown);
        assert_eq!(machines[0].status, MachineStatus::Unknown);
        assert_eq!(machines[0].time_remaining, None);
    }

    #[test]
    fn status_text_without_font_wrapper_still_parses() {
        let page = r#"<table><tr class="odd">
            <td></td><td>4</td><td>dryer</td><td>unavailable</td><td></td>
        </tr></table>"#;
        let machines = parse_status_page(3, page).unwrap();
        assert_eq!(machines[0].status, MachineStatus::Unavailable);
        assert_eq!(machines[0].external_id, None);
    }

    #[test]
    fn truncated_row_is_a_markup_error() {
        let page = r#"<table><tr class="even"><td>1</td><td>2</td></tr></table>"#;
        let error = parse_status_page(5, page).unwrap_err();
        assert!(matches!(error, ProviderError::Markup(_)));
        assert!(!error.is_connectivity());
    }

    #[test]
    fn fractional_minutes_convert_to_duration() {
        assert_eq!(parse_minutes("0.5"), Some(Duration::from_secs(30)));
        assert_eq!(parse_minutes("  10  "), Some(Duration::from_secs(600)));
        assert_eq!(parse_minutes(""), None);
        assert_eq!(parse_minutes("n/a"), None);
        assert_eq!(parse_minutes("-3"), None);
    }

    #[test]
    fn room_url_carries_the_room_parameter() {
        let provider = EsudsProvider::new("http://esuds.net/", Client::new());
        assert_eq!(
            provider.room_url(1310),
            "http://esuds.net/RoomStatus/machineStatus.i?bottomLocationId=1310"
        );
    }
}
