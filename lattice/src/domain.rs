use crate::{LatticeError, LatticeResult};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of one Domain value. Node caches are keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(u64);

impl DomainId {
    fn next() -> Self {
        DomainId(NEXT_DOMAIN_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Immutable named-array evaluation grid
///
/// `declarations` hold the raw sample arrays as supplied, each with its own
/// length. `bindings` hold the arrays evaluation runs over; they always share
/// one length, which is the domain's length. Bound names are always declared.
///
/// Every transform returns a new `Domain` with its own [`DomainId`] and its
/// own copies of the data. `Domain` is intentionally not `Clone`: two values
/// with equal contents are still different domains as far as caching goes.
#[derive(Debug)]
pub struct Domain {
    id: DomainId,
    declarations: BTreeMap<String, Vec<f64>>,
    bindings: BTreeMap<String, Vec<f64>>,
    length: usize,
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Domain {}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

impl Domain {
    pub fn new() -> Self {
        Self::build(BTreeMap::new(), BTreeMap::new())
    }

    /// Domain with the given raw declarations and nothing bound yet
    pub fn from_declarations<I, S>(declarations: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let declarations = declarations
            .into_iter()
            .map(|(name, values)| (name.into(), values))
            .collect();
        Self::build(declarations, BTreeMap::new())
    }

    fn build(
        declarations: BTreeMap<String, Vec<f64>>,
        bindings: BTreeMap<String, Vec<f64>>,
    ) -> Self {
        let length = bindings.values().next().map(Vec::len).unwrap_or(0);
        Self {
            id: DomainId::next(),
            declarations,
            bindings,
            length,
        }
    }

    pub fn id(&self) -> DomainId {
        self.id
    }

    /// Number of evaluation points (0 when nothing is bound)
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declarations.contains_key(name)
    }

    /// Copy of the array currently bound to `name`
    pub fn binding(&self, name: &str) -> LatticeResult<Vec<f64>> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| LatticeError::Domain(format!("{} is not bound in the domain", name)))
    }

    /// Copy of the raw declared array for `name`
    pub fn declaration(&self, name: &str) -> LatticeResult<Vec<f64>> {
        self.declarations
            .get(name)
            .cloned()
            .ok_or_else(|| LatticeError::Domain(format!("{} is not defined in the domain", name)))
    }

    pub fn bound_names(&self) -> Vec<String> {
        self.bindings.keys().cloned().collect()
    }

    pub fn declared_names(&self) -> Vec<String> {
        self.declarations.keys().cloned().collect()
    }

    /// Add (or replace) a raw declaration without touching the bindings
    pub fn declare(&self, name: &str, values: Vec<f64>) -> Domain {
        let mut declarations = self.declarations.clone();
        declarations.insert(name.to_string(), values);
        Self::build(declarations, self.bindings.clone())
    }

    /// Cartesian-product bind of one declared variable
    ///
    /// With L points bound (1 if nothing is bound) and M declared values, the
    /// result has L×M points. Existing bindings are tiled M times end to end,
    /// and each new value is repeated L times, so earlier-bound variables vary
    /// fastest. Binding an already bound variable returns an unchanged copy.
    pub fn recombine_variable(&self, name: &str) -> LatticeResult<Domain> {
        if self.is_bound(name) {
            return Ok(Self::build(self.declarations.clone(), self.bindings.clone()));
        }
        let declared = self
            .declarations
            .get(name)
            .ok_or_else(|| LatticeError::Domain(format!("{} is not defined in the domain", name)))?;

        let current = if self.bindings.is_empty() { 1 } else { self.length };
        let count = declared.len();

        let mut bindings: BTreeMap<String, Vec<f64>> = self
            .bindings
            .iter()
            .map(|(bound, values)| {
                let mut tiled = Vec::with_capacity(current * count);
                for _ in 0..count {
                    tiled.extend_from_slice(values);
                }
                (bound.clone(), tiled)
            })
            .collect();

        let mut repeated = Vec::with_capacity(current * count);
        for &value in declared {
            repeated.extend(std::iter::repeat(value).take(current));
        }
        bindings.insert(name.to_string(), repeated);

        Ok(Self::build(self.declarations.clone(), bindings))
    }

    /// Recombine each name in turn, left to right
    pub fn recombine_variables<S: AsRef<str>>(&self, names: &[S]) -> LatticeResult<Domain> {
        let mut domain = Self::build(self.declarations.clone(), self.bindings.clone());
        for name in names {
            domain = domain.recombine_variable(name.as_ref())?;
        }
        Ok(domain)
    }

    /// Bind `name` directly to `values`, without any combination
    ///
    /// The domain length becomes `values.len()`. Every other binding must
    /// already have that length. An undeclared name is declared with `values`.
    pub fn set_variable(&self, name: &str, values: Vec<f64>) -> LatticeResult<Domain> {
        if let Some((other, existing)) = self
            .bindings
            .iter()
            .find(|(bound, existing)| bound.as_str() != name && existing.len() != values.len())
        {
            return Err(LatticeError::Domain(format!(
                "cannot bind {} with {} points while {} is bound with {}",
                name,
                values.len(),
                other,
                existing.len()
            )));
        }

        let mut declarations = self.declarations.clone();
        declarations
            .entry(name.to_string())
            .or_insert_with(|| values.clone());
        let mut bindings = self.bindings.clone();
        bindings.insert(name.to_string(), values);
        Ok(Self::build(declarations, bindings))
    }

    /// Project `name` out of the domain
    ///
    /// The binding and declaration are dropped, then duplicate points across
    /// the remaining bound variables collapse into one. Rows are compared
    /// column by column in name order; the surviving rows come out in that
    /// total order.
    pub fn remove_variable(&self, name: &str) -> Domain {
        if !self.is_declared(name) {
            return Self::build(self.declarations.clone(), self.bindings.clone());
        }

        let mut declarations = self.declarations.clone();
        declarations.remove(name);
        let mut remaining = self.bindings.clone();
        remaining.remove(name);

        if remaining.is_empty() {
            return Self::build(declarations, remaining);
        }

        let columns: Vec<&Vec<f64>> = remaining.values().collect();
        let mut rows: Vec<Vec<f64>> = (0..self.length)
            .map(|i| columns.iter().map(|column| column[i]).collect())
            .collect();
        rows.sort_by(|a, b| compare_rows(a, b));
        rows.dedup_by(|a, b| compare_rows(a, b) == Ordering::Equal);

        let bindings = remaining
            .keys()
            .enumerate()
            .map(|(col, bound)| (bound.clone(), rows.iter().map(|row| row[col]).collect()))
            .collect();

        Self::build(declarations, bindings)
    }

    /// Partition into contiguous blocks of `ceil(len / count)` points, in
    /// point order. The last block holds the remainder, so an uneven split
    /// can produce fewer than `count` blocks (5 points into 4 gives 2, 2, 1).
    pub fn split(&self, count: usize) -> LatticeResult<Vec<Domain>> {
        if count < 1 || count > self.length {
            return Err(LatticeError::Domain(format!(
                "cannot split a domain of {} points into {} blocks",
                self.length, count
            )));
        }

        let block_size = self.length.div_ceil(count);
        let mut blocks = Vec::with_capacity(count);
        let mut start = 0;
        while start < self.length {
            let end = (start + block_size).min(self.length);
            let bindings = self
                .bindings
                .iter()
                .map(|(name, values)| (name.clone(), values[start..end].to_vec()))
                .collect();
            blocks.push(Self::build(self.declarations.clone(), bindings));
            start = end;
        }
        Ok(blocks)
    }

    /// True iff every declared array has the same length (or nothing is declared)
    pub fn is_same_length_defs(&self) -> bool {
        let mut lengths = self.declarations.values().map(Vec::len);
        match lengths.next() {
            Some(first) => lengths.all(|len| len == first),
            None => true,
        }
    }
}

fn compare_rows(a: &[f64], b: &[f64]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
