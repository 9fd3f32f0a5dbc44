//! Red-cell compatibility between ABO/Rh blood types.
//!
//! The recipient → donors table is fixed. It is materialized once on first
//! use together with its inverse and never changes afterwards, so lookups
//! need no locking.

use lazy_static::lazy_static;

use crate::error::CompatibilityError;
use crate::types::BloodType::{self, *};

lazy_static! {
    static ref TABLE: CompatibilityTable = CompatibilityTable::build();
}

/// Donors accepted by `recipient`: same type first, then groups A, B, O with Rh- before Rh+.
const fn canonical_donors(recipient: BloodType) -> &'static [BloodType] {
    match recipient {
        ONeg => &[ONeg],
        OPos => &[OPos, ONeg],
        ANeg => &[ANeg, ONeg],
        APos => &[APos, ANeg, ONeg, OPos],
        BNeg => &[BNeg, ONeg],
        BPos => &[BPos, BNeg, ONeg, OPos],
        AbNeg => &[AbNeg, ANeg, BNeg, ONeg],
        AbPos => &[AbPos, AbNeg, ANeg, APos, BNeg, BPos, ONeg, OPos],
    }
}

/// Immutable compatibility lookup indexed by [`BloodType::index`]
#[derive(Debug)]
pub struct CompatibilityTable {
    donors: [&'static [BloodType]; BloodType::COUNT],
    recipients: [Vec<BloodType>; BloodType::COUNT],
}

impl CompatibilityTable {
    fn build() -> Self {
        let donors = BloodType::ALL.map(canonical_donors);
        let recipients = BloodType::ALL.map(|donor| {
            BloodType::ALL
                .iter()
                .copied()
                .filter(|recipient| donors[recipient.index()].contains(&donor))
                .collect()
        });

        Self { donors, recipients }
    }

    /// The process-wide table
    pub fn global() -> &'static CompatibilityTable {
        &TABLE
    }

    pub fn is_compatible(&self, donor: BloodType, recipient: BloodType) -> bool {
        self.donors[recipient.index()].contains(&donor)
    }

    pub fn donors_for(&self, recipient: BloodType) -> &[BloodType] {
        self.donors[recipient.index()]
    }

    pub fn recipients_for(&self, donor: BloodType) -> &[BloodType] {
        &self.recipients[donor.index()]
    }

    /// Full grid as `matrix[donor][recipient]`
    pub fn matrix(&self) -> [[bool; BloodType::COUNT]; BloodType::COUNT] {
        BloodType::ALL
            .map(|donor| BloodType::ALL.map(|recipient| self.is_compatible(donor, recipient)))
    }
}

/// Whether blood of type `donor` may be given to `recipient`
pub fn is_compatible(donor: BloodType, recipient: BloodType) -> bool {
    TABLE.is_compatible(donor, recipient)
}

/// Donor types accepted by `recipient`, most preferred first
pub fn compatible_donors_for(recipient: BloodType) -> &'static [BloodType] {
    TABLE.donors_for(recipient)
}

/// Recipient types that can receive from `donor`, in canonical order
pub fn compatible_recipients_for(donor: BloodType) -> &'static [BloodType] {
    TABLE.recipients_for(donor)
}

/// Label form of [`is_compatible`]. Both labels are validated before any lookup.
pub fn is_compatible_labels(donor: &str, recipient: &str) -> Result<bool, CompatibilityError> {
    let donor: BloodType = donor.parse()?;
    let recipient: BloodType = recipient.parse()?;
    Ok(is_compatible(donor, recipient))
}

/// Label form of [`compatible_donors_for`]
pub fn compatible_donors_for_label(
    recipient: &str,
) -> Result<&'static [BloodType], CompatibilityError> {
    parse_known(recipient).map(compatible_donors_for)
}

/// Label form of [`compatible_recipients_for`]
pub fn compatible_recipients_for_label(
    donor: &str,
) -> Result<&'static [BloodType], CompatibilityError> {
    parse_known(donor).map(compatible_recipients_for)
}

fn parse_known(label: &str) -> Result<BloodType, CompatibilityError> {
    label
        .parse()
        .map_err(|_| CompatibilityError::UnknownBloodType(label.trim().to_string()))
}
