//! Multi-match deletion resolver
//!
//! A deletion by zone, name and type can match several recordsets. One match
//! is deleted directly. Several matches are deleted only when forced, or
//! after the operator picks candidates through a [`Confirm`] callback. The
//! whole selection is validated before anything is sent, and each outcome
//! takes a single mutating request.

use std::collections::BTreeSet;
use std::io::{self, BufRead, Write};

use crate::api::{DnsApi, RecordSetFilter};
use crate::dns::errors::{DnsError, DnsResult};
use crate::dns::find_recordsets;
use crate::dns::reconcile::bump_serial;
use crate::dns::recordset::{RecordKey, Recordset};

/// Source of the operator's answer when several recordsets match
pub trait Confirm {
    /// Returns the raw answer: comma separated 1-based indices, `all`, or an
    /// empty string to abort.
    fn choose(&mut self, candidates: &[Recordset]) -> io::Result<String>;
}

/// Numbered prompt over a reader/writer pair, normally stdin and stderr
pub struct PromptConfirm<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        PromptConfirm { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for PromptConfirm<R, W> {
    fn choose(&mut self, candidates: &[Recordset]) -> io::Result<String> {
        writeln!(self.output, "{} recordsets match:", candidates.len())?;
        for (i, rs) in candidates.iter().enumerate() {
            writeln!(
                self.output,
                "  [{}] {} {} {} {}",
                i + 1,
                rs.name,
                rs.record_type,
                rs.ttl,
                rs.rdata.join(", ")
            )?;
        }
        write!(
            self.output,
            "Enter numbers to delete (e.g. 1,3), 'all', or nothing to abort: "
        )?;
        self.output.flush()?;

        let mut answer = String::new();
        self.input.read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

/// Answers every prompt with a fixed string
pub struct FixedAnswer(pub String);

impl Confirm for FixedAnswer {
    fn choose(&mut self, _candidates: &[Recordset]) -> io::Result<String> {
        Ok(self.0.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based candidate indices, in the order given, without duplicates
    Indices(Vec<usize>),
    All,
    Abort,
}

/// Parses an operator answer against `count` candidates.
pub fn parse_selection(input: &str, count: usize) -> DnsResult<Selection> {
    let answer = input.trim();
    if answer.is_empty() {
        return Ok(Selection::Abort);
    }
    if answer.eq_ignore_ascii_case("all") {
        return Ok(Selection::All);
    }

    let invalid = |reason: String| DnsError::InvalidSelection {
        input: input.to_string(),
        reason,
    };

    let mut seen = BTreeSet::new();
    let mut indices = Vec::new();
    for part in answer.split(',') {
        let part = part.trim();
        let index: usize = part
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a number", part)))?;
        if index == 0 || index > count {
            return Err(invalid(format!(
                "{} is out of range, choose between 1 and {}",
                index, count
            )));
        }
        if seen.insert(index) {
            indices.push(index - 1);
        }
    }

    Ok(Selection::Indices(indices))
}

/// How the resolver may proceed without asking
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResolveFlags {
    /// Never prompt; ambiguous matches are an error unless forced
    pub non_interactive: bool,
    /// Delete every match without asking
    pub force_multiple: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveOutcome {
    Deleted(Vec<Recordset>),
    /// The operator declined; nothing was deleted
    Aborted,
}

/// Decides which of `candidates` to delete. Returns `None` on abort.
pub fn choose_candidates(
    zone: &str,
    key: &RecordKey,
    candidates: Vec<Recordset>,
    flags: ResolveFlags,
    confirm: &mut dyn Confirm,
) -> DnsResult<Option<Vec<Recordset>>> {
    match candidates.len() {
        0 => Err(DnsError::NotFound {
            zone: zone.to_string(),
            key: Some(key.clone()),
        }),
        1 => Ok(Some(candidates)),
        _ if flags.force_multiple => Ok(Some(candidates)),
        n if flags.non_interactive => Err(DnsError::AmbiguousDeletion {
            zone: zone.to_string(),
            key: key.clone(),
            candidates: n,
        }),
        n => {
            let answer = confirm
                .choose(&candidates)
                .map_err(|e| DnsError::InvalidSelection {
                    input: String::new(),
                    reason: format!("could not read answer: {}", e),
                })?;

            match parse_selection(&answer, n)? {
                Selection::Abort => Ok(None),
                Selection::All => Ok(Some(candidates)),
                Selection::Indices(indices) => Ok(Some(
                    indices.into_iter().map(|i| candidates[i].clone()).collect(),
                )),
            }
        }
    }
}

/// Deletes the recordsets matching `key` in `zone`, resolving ambiguity per
/// `flags` and `confirm`.
///
/// Deleting by key removes every recordset under it, so that is only done
/// when every candidate was chosen. A strict subset is removed by submitting
/// the zone's collection without the chosen candidates in one update, with
/// the SOA serial advanced.
pub fn delete_matching(
    api: &dyn DnsApi,
    zone: &str,
    key: &RecordKey,
    flags: ResolveFlags,
    confirm: &mut dyn Confirm,
) -> DnsResult<ResolveOutcome> {
    let candidates = find_recordsets(api, zone, key)?;
    let total = candidates.len();
    log::debug!("{} candidate(s) for {} in zone {}", total, key, zone);

    let chosen = match choose_candidates(zone, key, candidates, flags, confirm)? {
        Some(chosen) => chosen,
        None => {
            log::info!("Deletion of {} in zone {} aborted", key, zone);
            return Ok(ResolveOutcome::Aborted);
        }
    };

    if chosen.len() == total {
        api.delete_record(zone, &chosen[0].name, &chosen[0].record_type)
            .map_err(|e| DnsError::from_api(zone, Some(key), e))?;
    } else {
        remove_candidates(api, zone, key, &chosen)?;
    }
    log::info!("Deleted {} recordset(s) for {} in zone {}", chosen.len(), key, zone);

    Ok(ResolveOutcome::Deleted(chosen))
}

fn remove_candidates(api: &dyn DnsApi, zone: &str, key: &RecordKey, chosen: &[Recordset]) -> DnsResult<()> {
    let mut remaining = api
        .get_record_sets(zone, &RecordSetFilter::default())
        .map_err(|e| DnsError::from_api(zone, None, e))?;

    for candidate in chosen {
        let index = remaining
            .iter()
            .position(|rs| rs == candidate)
            .ok_or_else(|| DnsError::NotFound {
                zone: zone.to_string(),
                key: Some(key.clone()),
            })?;
        remaining.remove(index);
    }
    bump_serial(zone, &mut remaining)?;

    log::debug!(
        "Removing {} of the recordsets for {} in zone {} by full update",
        chosen.len(),
        key,
        zone
    );
    api.update_record_sets(zone, &remaining)
        .map_err(|e| DnsError::api(format!("remove {} candidates in zone {}", key, zone), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(n: usize) -> Vec<Recordset> {
        (1..=n)
            .map(|i| {
                Recordset::new(
                    "www.example.com",
                    "A",
                    300,
                    vec![format!("192.0.2.{}", i)],
                )
            })
            .collect()
    }

    fn key() -> RecordKey {
        RecordKey::new("www.example.com", "A")
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("", 3).unwrap(), Selection::Abort);
        assert_eq!(parse_selection("  \n", 3).unwrap(), Selection::Abort);
        assert_eq!(parse_selection("ALL", 3).unwrap(), Selection::All);
        assert_eq!(
            parse_selection("3, 1,3", 3).unwrap(),
            Selection::Indices(vec![2, 0])
        );
    }

    #[test]
    fn test_parse_selection_rejects_bad_input() {
        for bad in &["1,9", "0", "1,,2", "one", "-1"] {
            let err = parse_selection(bad, 3).unwrap_err();
            assert!(matches!(err, DnsError::InvalidSelection { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_single_match_needs_no_prompt() {
        let mut confirm = FixedAnswer("should not be asked".into());
        let chosen = choose_candidates("example.com", &key(), candidates(1), ResolveFlags::default(), &mut confirm)
            .unwrap()
            .unwrap();
        assert_eq!(chosen.len(), 1);
    }

    #[test]
    fn test_no_match() {
        let mut confirm = FixedAnswer(String::new());
        let err = choose_candidates("example.com", &key(), vec![], ResolveFlags::default(), &mut confirm)
            .unwrap_err();
        assert!(matches!(err, DnsError::NotFound { key: Some(_), .. }));
    }

    #[test]
    fn test_non_interactive_refuses_to_guess() {
        let flags = ResolveFlags {
            non_interactive: true,
            force_multiple: false,
        };
        let mut confirm = FixedAnswer("1".into());
        let err = choose_candidates("example.com", &key(), candidates(3), flags, &mut confirm).unwrap_err();
        assert!(matches!(err, DnsError::AmbiguousDeletion { candidates: 3, .. }));
    }

    #[test]
    fn test_force_multiple_takes_all() {
        let flags = ResolveFlags {
            non_interactive: true,
            force_multiple: true,
        };
        let mut confirm = FixedAnswer(String::new());
        let chosen = choose_candidates("example.com", &key(), candidates(3), flags, &mut confirm)
            .unwrap()
            .unwrap();
        assert_eq!(chosen.len(), 3);
    }

    #[test]
    fn test_prompt_renders_candidates_and_reads_answer() {
        let mut output = Vec::new();
        let answer = {
            let mut prompt = PromptConfirm::new(&b"1,3\n"[..], &mut output);
            prompt.choose(&candidates(3)).unwrap()
        };

        assert_eq!(answer, "1,3");
        let rendered = String::from_utf8(output).unwrap();
        assert!(rendered.contains("[3] www.example.com A 300 192.0.2.3"));
    }

    #[test]
    fn test_prompt_selection() {
        let mut prompt = PromptConfirm::new(&b"1,3\n"[..], io::sink());
        let chosen = choose_candidates("example.com", &key(), candidates(3), ResolveFlags::default(), &mut prompt)
            .unwrap()
            .unwrap();

        let targets: Vec<&str> = chosen.iter().map(|rs| rs.rdata[0].as_str()).collect();
        assert_eq!(targets, vec!["192.0.2.1", "192.0.2.3"]);
    }

    #[test]
    fn test_empty_answer_aborts() {
        let mut prompt = PromptConfirm::new(&b"\n"[..], io::sink());
        let chosen =
            choose_candidates("example.com", &key(), candidates(2), ResolveFlags::default(), &mut prompt).unwrap();
        assert!(chosen.is_none());
    }
}
