use std::fmt;

/// Summary of a count-valued quantity: range, mean and number of observations.
#[derive(Clone, Debug, PartialEq)]
pub struct Stats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub mean: f64,
}

impl Stats {
    pub fn single(value: usize) -> Self {
        Stats {
            count: 1,
            min: value,
            max: value,
            mean: value as f64,
        }
    }

    pub fn push(&mut self, value: usize) {
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.mean += (value as f64 - self.mean) / self.count as f64;
    }

    pub fn merge(&self, other: &Self) -> Self {
        let count = self.count + other.count;
        Stats {
            count,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
            mean: match count {
                0 => 0.0,
                n => (self.mean * self.count as f64 + other.mean * other.count as f64) / n as f64,
            },
        }
    }

    /// Adds a constant to every observation.
    pub fn shifted(self, by: usize) -> Self {
        if self.count == 0 {
            return self;
        }
        Stats {
            min: self.min + by,
            max: self.max + by,
            mean: self.mean + by as f64,
            ..self
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            count: 0,
            min: usize::MAX,
            max: 0,
            mean: 0.0,
        }
    }
}

impl FromIterator<usize> for Stats {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut stats = Stats::default();
        for value in iter {
            stats.push(value);
        }
        stats
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "empty");
        }
        write!(
            f,
            "{}..={} (mean {:.2}, n = {})",
            self.min, self.max, self.mean, self.count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{assert, check};

    #[test]
    fn collects_from_iterator() {
        let s: Stats = [4, 1, 7].into_iter().collect();
        check!(s.count == 3);
        check!(s.min == 1);
        check!(s.max == 7);
        check!(s.mean == 4.0);
    }

    #[test]
    fn merge_weights_by_count() {
        let a = Stats::single(10);
        let b: Stats = [30, 50].into_iter().collect();
        let m = a.merge(&b);
        check!(m.count == 3);
        check!(m.min == 10);
        check!(m.max == 50);
        check!(m.mean == 30.0);
    }

    #[test]
    fn default_is_neutral() {
        let s = Stats::single(5);
        assert!(Stats::default().merge(&s) == s);
        assert!(Stats::default().merge(&Stats::default()) == Stats::default());
    }

    #[test]
    fn shifting() {
        check!(Stats::single(2).shifted(3) == Stats::single(5));
        check!(Stats::default().shifted(3) == Stats::default());
    }

    #[test]
    fn display_format() {
        check!(Stats::single(42).to_string() == "42..=42 (mean 42.00, n = 1)");
        check!(Stats::default().to_string() == "empty");
    }
}
