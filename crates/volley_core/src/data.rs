//! Data-driven weapon definitions.
//!
//! Weapon and projectile tuning is authored as RON and validated when
//! the catalog is loaded. A bad value (zero radius, negative lifetime)
//! is rejected here, at data-authoring time; the simulation itself
//! never checks launch parameters.
//!
//! Fixed-point fields are authored as their raw bit representation to
//! keep load exact; see the example below.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};
use crate::math::{fixed_serde, Fixed};
use crate::projectile::ProjectileConfig;
use crate::weapon::Weapon;

/// Data-driven weapon definition.
///
/// # Example RON
///
/// ```ron
/// WeaponData(
///     id: "cannon",
///     rate_of_fire: 2147483648,  // Fixed-point for 0.5
///     projectile: ProjectileConfig(
///         damage: 10,
///         speed: 429496729600,      // Fixed-point for 100.0
///         radius: 214748365,        // Fixed-point for 0.05
///         gravity: 0,
///         time_to_live: 6442450944, // Fixed-point for 1.5
///         time_to_fade: 2147483648, // Fixed-point for 0.5
///         owner_velocity_multiplier: 4294967296, // Fixed-point for 1.0
///         hit_mask: 4294967295,
///     ),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponData {
    /// Unique string identifier for this weapon type.
    pub id: String,
    /// Seconds between shots (fixed-point).
    #[serde(with = "fixed_serde")]
    pub rate_of_fire: Fixed,
    /// Launch parameters of the projectile this weapon fires.
    pub projectile: ProjectileConfig,
}

/// Validated registry of weapon definitions.
#[derive(Debug, Clone, Default)]
pub struct WeaponCatalog {
    weapons: HashMap<String, WeaponData>,
}

impl WeaponCatalog {
    /// The catalog bundled with the crate (`data/weapons.ron`).
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled data fails validation, which is
    /// a packaging defect rather than a runtime condition.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(include_str!("../data/weapons.ron"))
    }

    /// Parse and validate a catalog from RON source.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataParseError`] for malformed RON or a
    /// duplicate id, and [`SimError::InvalidConfig`] for entries whose
    /// parameters fail validation.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let entries: Vec<WeaponData> =
            ron::from_str(source).map_err(|e| SimError::DataParseError {
                name: "weapon catalog".to_owned(),
                message: e.to_string(),
            })?;

        let mut weapons = HashMap::new();
        for data in entries {
            data.projectile.validate()?;
            if data.rate_of_fire < Fixed::ZERO {
                return Err(SimError::InvalidConfig {
                    field: "rate_of_fire",
                    message: format!("must not be negative, got {}", data.rate_of_fire),
                });
            }
            if weapons.insert(data.id.clone(), data).is_some() {
                return Err(SimError::DataParseError {
                    name: "weapon catalog".to_owned(),
                    message: "duplicate weapon id".to_owned(),
                });
            }
        }

        Ok(Self { weapons })
    }

    /// Look up a weapon definition by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WeaponData> {
        self.weapons.get(id)
    }

    /// Instantiate a weapon from its definition.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::DataParseError`] for an unknown id.
    pub fn instantiate(&self, id: &str) -> Result<Weapon> {
        let data = self.weapons.get(id).ok_or_else(|| SimError::DataParseError {
            name: id.to_owned(),
            message: "unknown weapon id".to_owned(),
        })?;
        Ok(Weapon::new(data.projectile, data.rate_of_fire))
    }

    /// Number of definitions loaded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }
}
