use arena_types::EnergyPack;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

pub const DEFAULT_MAX_ENERGY: i32 = 100;
pub const DEFAULT_REGEN_MINUTES: i64 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnergyError {
    #[error("not enough energy: need {needed}, have {available}")]
    InsufficientEnergy { needed: i32, available: i32 },
    #[error("not enough coins: need {needed}, have {available}")]
    InsufficientCoins { needed: i32, available: i32 },
    #[error("energy is already full")]
    AlreadyFull,
}

/// Energy amount and coin price of a purchasable pack.
pub fn pack_contents(pack: EnergyPack) -> (i32, i32) {
    match pack {
        EnergyPack::Small => (20, 30),
        EnergyPack::Large => (60, 80),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnergyWallet {
    pub energy: i32,
    pub max_energy: i32,
    /// Point in time the stored `energy` value refers to.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurchaseOutcome {
    pub wallet: EnergyWallet,
    pub energy_added: i32,
    pub coins_spent: i32,
    pub coins_remaining: i32,
}

impl EnergyWallet {
    pub fn new(energy: i32, max_energy: i32, updated_at: DateTime<Utc>) -> Self {
        Self {
            energy: energy.clamp(0, max_energy.max(0)),
            max_energy: max_energy.max(0),
            updated_at,
        }
    }

    /// Apply regeneration up to `now`. Partial intervals are kept by only
    /// advancing `updated_at` by whole intervals.
    pub fn regenerate(&self, now: DateTime<Utc>, interval: Duration) -> Self {
        if self.energy >= self.max_energy {
            return Self {
                updated_at: now.max(self.updated_at),
                ..*self
            };
        }
        if interval <= Duration::zero() || now <= self.updated_at {
            return *self;
        }

        let elapsed = now - self.updated_at;
        let intervals = elapsed.num_seconds() / interval.num_seconds().max(1);
        let missing = i64::from(self.max_energy - self.energy);
        let gained = intervals.min(missing);

        if gained >= missing {
            return Self {
                energy: self.max_energy,
                updated_at: now,
                ..*self
            };
        }

        Self {
            energy: self.energy + gained as i32,
            updated_at: self.updated_at + interval * gained as i32,
            ..*self
        }
    }

    pub fn seconds_until_next_point(&self, now: DateTime<Utc>, interval: Duration) -> Option<i64> {
        if self.energy >= self.max_energy {
            return None;
        }
        let next = self.updated_at + interval;
        Some((next - now).num_seconds().max(0))
    }

    pub fn consume(
        &self,
        cost: i32,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<Self, EnergyError> {
        let current = self.regenerate(now, interval);
        if current.energy < cost {
            return Err(EnergyError::InsufficientEnergy {
                needed: cost,
                available: current.energy,
            });
        }

        // Spending from a full bar starts the regeneration clock now
        let updated_at = if current.energy >= current.max_energy {
            now
        } else {
            current.updated_at
        };
        Ok(Self {
            energy: current.energy - cost,
            updated_at,
            ..current
        })
    }

    /// Buy a pack with coins. Never leaves coins or energy negative and never
    /// fills past the maximum.
    pub fn purchase(
        &self,
        pack: EnergyPack,
        coins: i32,
        now: DateTime<Utc>,
        interval: Duration,
    ) -> Result<PurchaseOutcome, EnergyError> {
        let (amount, cost) = pack_contents(pack);
        if coins < cost {
            return Err(EnergyError::InsufficientCoins {
                needed: cost,
                available: coins.max(0),
            });
        }

        let current = self.regenerate(now, interval);
        if current.energy >= current.max_energy {
            return Err(EnergyError::AlreadyFull);
        }

        let energy = (current.energy + amount).min(current.max_energy);
        let updated_at = if energy >= current.max_energy {
            now
        } else {
            current.updated_at
        };
        Ok(PurchaseOutcome {
            wallet: Self {
                energy,
                updated_at,
                ..current
            },
            energy_added: energy - current.energy,
            coins_spent: cost,
            coins_remaining: coins - cost,
        })
    }
}
