use std::time::{SystemTime, UNIX_EPOCH};

/// Valor gravado em `end_time` para mapeamentos que não expiram.
const NEVER_SENTINEL: i64 = -1;

/// Prazo de validade de um mapeamento, em segundos desde a epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    At(i64),
}

impl Expiry {
    /// `ttl == 0` significa "nunca expira".
    pub fn from_ttl(ttl: u64, now: i64) -> Expiry {
        if ttl == 0 {
            return Expiry::Never;
        }
        let ttl = i64::try_from(ttl).unwrap_or(i64::MAX);
        Expiry::At(now.saturating_add(ttl))
    }

    pub fn from_column(end_time: i64) -> Expiry {
        if end_time < 0 {
            Expiry::Never
        } else {
            Expiry::At(end_time)
        }
    }

    pub fn to_column(self) -> i64 {
        match self {
            Expiry::Never => NEVER_SENTINEL,
            Expiry::At(t) => t,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self, Expiry::At(t) if *t <= now)
    }

    /// Predicado da varredura: prazo em (0, now].
    pub fn is_sweepable(&self, now: i64) -> bool {
        matches!(self, Expiry::At(t) if *t > 0 && *t <= now)
    }
}

/// Uma linha da tabela `mappings`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingEntry {
    pub key: String,
    pub destination: String,
    pub expiry: Expiry,
}

impl MappingEntry {
    pub fn new(key: impl Into<String>, destination: impl Into<String>, expiry: Expiry) -> Self {
        Self {
            key: key.into(),
            destination: destination.into(),
            expiry,
        }
    }
}

/// Segundos desde a epoch pelo relógio do sistema.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ttl_never_expires() {
        assert_eq!(Expiry::from_ttl(0, 1_000), Expiry::Never);
        assert!(!Expiry::Never.is_expired(i64::MAX));
        assert!(!Expiry::Never.is_sweepable(i64::MAX));
    }

    #[test]
    fn ttl_is_relative_to_now() {
        assert_eq!(Expiry::from_ttl(10, 1_000), Expiry::At(1_010));
        assert_eq!(Expiry::from_ttl(u64::MAX, 1_000), Expiry::At(i64::MAX));
    }

    #[test]
    fn column_sentinel() {
        assert_eq!(Expiry::Never.to_column(), -1);
        assert_eq!(Expiry::from_column(-1), Expiry::Never);
        assert_eq!(Expiry::from_column(42), Expiry::At(42));
    }

    #[test]
    fn expiry_boundary_is_inclusive() {
        let expiry = Expiry::At(100);
        assert!(!expiry.is_expired(99));
        assert!(expiry.is_expired(100));
        assert!(expiry.is_sweepable(100));
    }

    #[test]
    fn zero_deadline_is_not_swept() {
        assert!(Expiry::At(0).is_expired(10));
        assert!(!Expiry::At(0).is_sweepable(10));
    }
}
