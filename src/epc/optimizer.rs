//! Prefix-clustering optimizer.
//!
//! Groups identifiers that share a leading prefix so a frame can carry the
//! prefix once and only the differing suffixes per member.
//!
//! # Algorithm
//!
//! 1. Bucket the identifiers by their first [`MIN_PREFIX_HEX`] hex characters
//! 2. Every bucket with two or more members becomes a group whose prefix is the
//!    members' longest common prefix, trimmed to whole bytes
//! 3. Groups are emitted largest first (ties: longer prefix, then earlier input)
//! 4. Identifiers sharing no qualifying prefix become singleton groups whose
//!    prefix is the whole identifier
//!
//! Buckets are disjoint, so removing one group never changes the others; the
//! result is a partition of the input.
//!
//! # Example
//!
//! ```
//! use epc_lora_framer::epc::{optimize, Identifier};
//!
//! let ids: Vec<Identifier> = ["E28011606000020000003039", "E28011606000020000003040"]
//!     .iter()
//!     .map(|s| s.parse().unwrap())
//!     .collect();
//!
//! let groups = optimize(&ids);
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].prefix(), "E280116060000200000030");
//! assert_eq!(groups[0].metrics().total_payload_bytes, 13);
//! ```

use super::identifier::{Identifier, IDENTIFIER_BYTES, IDENTIFIER_HEX_LEN};
use std::collections::HashMap;
use std::fmt;

/// Minimum shared prefix (hex characters) worth encoding.
pub const MIN_PREFIX_HEX: usize = 6;

/// A set of identifiers sharing a common prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    prefix: String,
    members: Vec<Identifier>,
}

impl Group {
    /// The shared prefix in uppercase hex. Full identifier for singletons.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Members in input order.
    pub fn members(&self) -> &[Identifier] {
        &self.members
    }

    /// Number of members (always at least 1).
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// True when the group holds a single identifier with no shared prefix.
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }

    /// Size metrics for this group.
    pub fn metrics(&self) -> GroupMetrics {
        GroupMetrics::new(self.prefix.len(), self.members.len())
    }

    /// Consume the group, returning its members.
    pub fn into_members(self) -> Vec<Identifier> {
        self.members
    }
}

/// Reported size figures for a group. Not used for control flow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMetrics {
    pub prefix_bytes: usize,
    pub suffix_bytes: usize,
    pub member_count: usize,
    pub total_payload_bytes: usize,
    /// Saving against sending every member in full, in percent.
    pub compression_percent: f64,
}

impl GroupMetrics {
    fn new(prefix_hex_len: usize, member_count: usize) -> Self {
        let prefix_bytes = prefix_hex_len / 2;
        let suffix_bytes = (IDENTIFIER_HEX_LEN - prefix_hex_len) / 2;
        let total_payload_bytes = prefix_bytes + suffix_bytes * member_count;
        let uncompressed = (member_count * IDENTIFIER_BYTES) as f64;
        let compression_percent = if member_count == 0 {
            0.0
        } else {
            100.0 * (1.0 - total_payload_bytes as f64 / uncompressed)
        };
        Self {
            prefix_bytes,
            suffix_bytes,
            member_count,
            total_payload_bytes,
            compression_percent,
        }
    }

    /// How many members fit in `available_bytes` when the prefix is sent once
    /// and each member contributes only its suffix.
    ///
    /// A singleton has no suffix; it fits once if the whole identifier does.
    pub fn suffixes_per_frame(&self, available_bytes: usize) -> usize {
        if self.suffix_bytes == 0 {
            return usize::from(available_bytes >= self.prefix_bytes);
        }
        available_bytes.saturating_sub(self.prefix_bytes) / self.suffix_bytes
    }
}

/// Partition `ids` into prefix groups.
///
/// Identifiers are validated at construction, so this cannot fail; use
/// [`optimize_strs`] to group raw strings.
pub fn optimize(ids: &[Identifier]) -> Vec<Group> {
    let hex: Vec<String> = ids.iter().map(Identifier::to_hex).collect();

    // Bucket index by 6-char key, in order of first appearance
    let mut bucket_of: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    for (i, h) in hex.iter().enumerate() {
        let key = &h[..MIN_PREFIX_HEX];
        match bucket_of.get(key) {
            Some(&b) => buckets[b].push(i),
            None => {
                bucket_of.insert(key, buckets.len());
                buckets.push(vec![i]);
            }
        }
    }

    let mut shared: Vec<(usize, Vec<usize>)> = Vec::new();
    let mut singletons: Vec<usize> = Vec::new();
    for bucket in buckets {
        if bucket.len() >= 2 {
            let lcp = common_prefix_len(bucket.iter().map(|&i| hex[i].as_str()));
            shared.push((lcp - lcp % 2, bucket));
        } else {
            singletons.extend(bucket);
        }
    }

    shared.sort_by(|(len_a, a), (len_b, b)| {
        b.len()
            .cmp(&a.len())
            .then(len_b.cmp(len_a))
            .then(a[0].cmp(&b[0]))
    });
    singletons.sort_unstable();

    let mut groups: Vec<Group> = shared
        .into_iter()
        .map(|(prefix_len, bucket)| Group {
            prefix: hex[bucket[0]][..prefix_len].to_string(),
            members: bucket.iter().map(|&i| ids[i]).collect(),
        })
        .collect();

    groups.extend(singletons.into_iter().map(|i| Group {
        prefix: hex[i].clone(),
        members: vec![ids[i]],
    }));

    log::debug!(
        "Grouped {} identifiers into {} groups",
        ids.len(),
        groups.len()
    );
    groups
}

/// Validate and group raw identifier strings.
///
/// Fails atomically: one malformed string rejects the whole call.
pub fn optimize_strs<S: AsRef<str>>(
    inputs: &[S],
) -> Result<Vec<Group>, super::identifier::IdentifierError> {
    let ids = super::identifier::parse_all(inputs)?;
    Ok(optimize(&ids))
}

fn common_prefix_len<'a>(mut strs: impl Iterator<Item = &'a str>) -> usize {
    let Some(first) = strs.next() else {
        return 0;
    };
    let first = first.as_bytes();
    strs.fold(first.len(), |len, s| {
        first[..len]
            .iter()
            .zip(s.as_bytes())
            .take_while(|(a, b)| a == b)
            .count()
    })
}

/// Rebuild the identifier list from `(prefix, member_count)` pairs.
///
/// For each pair in order, takes the first `member_count` unused identifiers
/// of `original` starting with `prefix` (any unused identifier when `prefix`
/// is empty). Used to check that grouping output accounts for every input.
pub fn reconstruct(
    original: &[Identifier],
    groups: &[(String, usize)],
) -> Result<Vec<Identifier>, ReconstructionError> {
    let hex: Vec<String> = original.iter().map(Identifier::to_hex).collect();
    let mut used = vec![false; original.len()];
    let mut rebuilt = Vec::with_capacity(original.len());

    for (prefix, member_count) in groups {
        let prefix = prefix.to_ascii_uppercase();
        let matching: Vec<usize> = (0..original.len())
            .filter(|&i| !used[i] && hex[i].starts_with(&prefix))
            .take(*member_count)
            .collect();

        if matching.len() != *member_count {
            return Err(ReconstructionError::GroupShort {
                prefix,
                expected: *member_count,
                found: matching.len(),
            });
        }
        for i in matching {
            used[i] = true;
            rebuilt.push(original[i]);
        }
    }

    if rebuilt.len() != original.len() {
        return Err(ReconstructionError::CountMismatch {
            reconstructed: rebuilt.len(),
            original: original.len(),
        });
    }
    Ok(rebuilt)
}

/// `(prefix, member_count)` pairs for [`reconstruct`].
pub fn group_summary(groups: &[Group]) -> Vec<(String, usize)> {
    groups
        .iter()
        .map(|g| (g.prefix.clone(), g.member_count()))
        .collect()
}

/// Grouping output disagrees with the original identifier list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructionError {
    /// Not enough unused identifiers match a group's prefix.
    GroupShort {
        prefix: String,
        expected: usize,
        found: usize,
    },
    /// Groups cover a different number of identifiers than the original.
    CountMismatch {
        reconstructed: usize,
        original: usize,
    },
}

impl fmt::Display for ReconstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupShort {
                prefix,
                expected,
                found,
            } => write!(
                f,
                "reconstruction mismatch: prefix '{}' needs {} identifiers, found {}",
                prefix, expected, found
            ),
            Self::CountMismatch {
                reconstructed,
                original,
            } => write!(
                f,
                "reconstruction mismatch: rebuilt {} identifiers, original has {}",
                reconstructed, original
            ),
        }
    }
}

impl std::error::Error for ReconstructionError {}
