use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Allele observed in a pileup column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Allele {
    /// Adenine.
    A,
    /// Cytosine.
    C,
    /// Guanine.
    G,
    /// Thymine.
    T,
    /// Insertion event anchored at the reference position.
    Insertion,
    /// Deletion of the reference base.
    Deletion,
}

impl Allele {
    /// All alleles in tie-breaking order.
    pub const ALL: [Allele; 6] = [
        Allele::A,
        Allele::C,
        Allele::G,
        Allele::T,
        Allele::Insertion,
        Allele::Deletion,
    ];

    /// Allele for an uppercase or lowercase nucleotide, `None` for anything else.
    pub fn from_base(base: u8) -> Option<Self> {
        match base {
            b'A' | b'a' => Some(Allele::A),
            b'C' | b'c' => Some(Allele::C),
            b'G' | b'g' => Some(Allele::G),
            b'T' | b't' | b'U' | b'u' => Some(Allele::T),
            _ => None,
        }
    }

    /// Uppercase nucleotide for base alleles.
    pub fn as_base(self) -> Option<u8> {
        match self {
            Allele::A => Some(b'A'),
            Allele::C => Some(b'C'),
            Allele::G => Some(b'G'),
            Allele::T => Some(b'T'),
            Allele::Insertion | Allele::Deletion => None,
        }
    }

    /// Whether this allele is the reference base itself.
    pub fn matches_reference(self, reference: u8) -> bool {
        self.as_base() == Some(reference.to_ascii_uppercase())
    }

    /// Position of the allele in [`Allele::ALL`]; used to index per-allele tallies.
    pub const fn index(self) -> usize {
        match self {
            Allele::A => 0,
            Allele::C => 1,
            Allele::G => 2,
            Allele::T => 3,
            Allele::Insertion => 4,
            Allele::Deletion => 5,
        }
    }

    /// Insertion or deletion marker.
    pub fn is_indel(self) -> bool {
        matches!(self, Allele::Insertion | Allele::Deletion)
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allele::A => write!(f, "A"),
            Allele::C => write!(f, "C"),
            Allele::G => write!(f, "G"),
            Allele::T => write!(f, "T"),
            Allele::Insertion => write!(f, "INS"),
            Allele::Deletion => write!(f, "DEL"),
        }
    }
}

impl FromStr for Allele {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Allele::A),
            "C" => Ok(Allele::C),
            "G" => Ok(Allele::G),
            "T" | "U" => Ok(Allele::T),
            "INS" | "+" | "I" => Ok(Allele::Insertion),
            "DEL" | "-" | "D" | "*" => Ok(Allele::Deletion),
            other => Err(format!(
                "invalid allele '{other}' (expected A, C, G, T, INS or DEL)"
            )),
        }
    }
}

/// One `(position, allele)` tally from a pileup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupRecord {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// 1-based reference position.
    pub position: u32,
    /// Observed allele.
    pub allele: Allele,
    /// Number of reads supporting the allele.
    pub count: u32,
    /// Reference base at the position (uppercase ASCII).
    pub reference: u8,
}

impl PileupRecord {
    /// Construct a pileup record.
    pub fn new(
        chrom: impl Into<Arc<str>>,
        position: u32,
        allele: Allele,
        count: u32,
        reference: u8,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            position,
            allele,
            count,
            reference: reference.to_ascii_uppercase(),
        }
    }

    /// Whether the record reports a non-reference allele.
    pub fn is_mismatch(&self) -> bool {
        !self.allele.matches_reference(self.reference)
    }
}

/// Gene region processed as one independent unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRegion {
    /// Gene identifier attached to every candidate from this region.
    pub gene_id: Arc<str>,
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// 1-based inclusive start.
    pub start: u32,
    /// 1-based inclusive end.
    pub end: u32,
}

impl GeneRegion {
    /// Construct a region; `start` and `end` are 1-based inclusive.
    pub fn new(
        gene_id: impl Into<Arc<str>>,
        chrom: impl Into<Arc<str>>,
        start: u32,
        end: u32,
    ) -> Self {
        Self {
            gene_id: gene_id.into(),
            chrom: chrom.into(),
            start,
            end,
        }
    }

    /// Whether the 1-based position on `chrom` lies inside the region.
    pub fn contains(&self, chrom: &str, position: u32) -> bool {
        self.chrom.as_ref() == chrom && position >= self.start && position <= self.end
    }

    /// Number of reference positions spanned.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start) + 1
    }

    /// Whether the region is inverted (start after end).
    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

impl fmt::Display for GeneRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{}-{})", self.gene_id, self.chrom, self.start, self.end)
    }
}

/// Caller-supplied locus that is always reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KnownPosition {
    /// Chromosome/contig name.
    pub chrom: Arc<str>,
    /// 1-based position.
    pub position: u32,
}

impl KnownPosition {
    /// Construct a known position.
    pub fn new(chrom: impl Into<Arc<str>>, position: u32) -> Self {
        Self {
            chrom: chrom.into(),
            position,
        }
    }
}

/// Lookup set of known positions keyed by chromosome.
#[derive(Debug, Clone, Default)]
pub struct KnownPositions {
    by_chrom: HashMap<Arc<str>, HashSet<u32>>,
}

impl KnownPositions {
    /// Empty allowlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a position to the allowlist.
    pub fn insert(&mut self, known: KnownPosition) {
        self.by_chrom
            .entry(known.chrom)
            .or_default()
            .insert(known.position);
    }

    /// Whether `chrom:position` is on the allowlist.
    pub fn contains(&self, chrom: &str, position: u32) -> bool {
        self.by_chrom
            .get(chrom)
            .is_some_and(|positions| positions.contains(&position))
    }

    /// Number of listed positions.
    pub fn len(&self) -> usize {
        self.by_chrom.values().map(HashSet::len).sum()
    }

    /// Whether no positions are listed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<KnownPosition> for KnownPositions {
    fn from_iter<I: IntoIterator<Item = KnownPosition>>(iter: I) -> Self {
        let mut set = Self::new();
        for known in iter {
            set.insert(known);
        }
        set
    }
}
