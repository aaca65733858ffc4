//! Taxonomy providers and their federated knowledge-base properties.
//!
//! External ids look like `PREFIX:localId`. A provider is recognized by the
//! longest known prefix the id starts with (exact, case-sensitive), so prefixes
//! that themselves contain colons (`FBC:FB:SpecCode:`) resolve correctly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A taxonomic authority that issues identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxonomyProvider {
    OpenTreeOfLife,
    BoldTaxon,
    IndexFungorum,
    Itis,
    Ncbi,
    Eol,
    EolV2,
    Worms,
    InterimRegisterOfMarineAndNonmarineGenera,
    FishbaseSpeccode,
    SealifebaseSpeccode,
    Gbif,
    InaturalistTaxon,
    Nbn,
    Msw,
    Plazi,
    CatalogueOfLife,
    WorldOfFloraOnline,
    Wikidata,
    Geonames,
    Envo,
    Wikipedia,
}

impl TaxonomyProvider {
    pub const ALL: [TaxonomyProvider; 22] = [
        TaxonomyProvider::OpenTreeOfLife,
        TaxonomyProvider::BoldTaxon,
        TaxonomyProvider::IndexFungorum,
        TaxonomyProvider::Itis,
        TaxonomyProvider::Ncbi,
        TaxonomyProvider::Eol,
        TaxonomyProvider::EolV2,
        TaxonomyProvider::Worms,
        TaxonomyProvider::InterimRegisterOfMarineAndNonmarineGenera,
        TaxonomyProvider::FishbaseSpeccode,
        TaxonomyProvider::SealifebaseSpeccode,
        TaxonomyProvider::Gbif,
        TaxonomyProvider::InaturalistTaxon,
        TaxonomyProvider::Nbn,
        TaxonomyProvider::Msw,
        TaxonomyProvider::Plazi,
        TaxonomyProvider::CatalogueOfLife,
        TaxonomyProvider::WorldOfFloraOnline,
        TaxonomyProvider::Wikidata,
        TaxonomyProvider::Geonames,
        TaxonomyProvider::Envo,
        TaxonomyProvider::Wikipedia,
    ];

    /// Prefix (including the trailing colon) of ids issued by this provider.
    pub fn id_prefix(self) -> &'static str {
        match self {
            TaxonomyProvider::OpenTreeOfLife => "OTT:",
            TaxonomyProvider::BoldTaxon => "BOLDTaxon:",
            TaxonomyProvider::IndexFungorum => "IF:",
            TaxonomyProvider::Itis => "ITIS:",
            TaxonomyProvider::Ncbi => "NCBI:",
            TaxonomyProvider::Eol => "EOL:",
            TaxonomyProvider::EolV2 => "EOL_V2:",
            TaxonomyProvider::Worms => "WORMS:",
            TaxonomyProvider::InterimRegisterOfMarineAndNonmarineGenera => "IRMNG:",
            TaxonomyProvider::FishbaseSpeccode => "FBC:FB:SpecCode:",
            TaxonomyProvider::SealifebaseSpeccode => "FBC:SLB:SpecCode:",
            TaxonomyProvider::Gbif => "GBIF:",
            TaxonomyProvider::InaturalistTaxon => "INAT_TAXON:",
            TaxonomyProvider::Nbn => "NBN:",
            TaxonomyProvider::Msw => "MSW:",
            TaxonomyProvider::Plazi => "PLAZI:",
            TaxonomyProvider::CatalogueOfLife => "COL:",
            TaxonomyProvider::WorldOfFloraOnline => "WFO:",
            TaxonomyProvider::Wikidata => "WD:",
            TaxonomyProvider::Geonames => "GEONAMES:",
            TaxonomyProvider::Envo => "ENVO:",
            TaxonomyProvider::Wikipedia => "W:",
        }
    }

    /// Provider whose prefix is the longest prefix of `external_id`.
    pub fn for_external_id(external_id: &str) -> Option<TaxonomyProvider> {
        Self::ALL
            .iter()
            .copied()
            .filter(|p| external_id.starts_with(p.id_prefix()))
            .max_by_key(|p| p.id_prefix().len())
    }

    /// Local part of `external_id`, if it carries this provider's prefix.
    pub fn strip_prefix(self, external_id: &str) -> Option<&str> {
        external_id.strip_prefix(self.id_prefix())
    }

    /// `prefix + local_id`.
    pub fn external_id(self, local_id: &str) -> String {
        format!("{}{}", self.id_prefix(), local_id)
    }
}

impl fmt::Display for TaxonomyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id_prefix().trim_end_matches(':'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no known taxonomy provider for [{0}]")]
pub struct UnknownProvider(pub String);

/// Split `external_id` into its provider and local id.
pub fn parse_external_id(external_id: &str) -> Result<(TaxonomyProvider, &str), UnknownProvider> {
    let provider = TaxonomyProvider::for_external_id(external_id)
        .ok_or_else(|| UnknownProvider(external_id.to_string()))?;
    let local = provider
        .strip_prefix(external_id)
        .ok_or_else(|| UnknownProvider(external_id.to_string()))?;
    Ok((provider, local))
}

// ============================================================================
// Provider ↔ property tables
// ============================================================================

/// Bidirectional provider ↔ federated-property tables.
///
/// Built once and shared by reference. `Eol` and `EolV2` both map to `P830`;
/// the reverse table resolves `P830` to `Eol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderIdentifierMap {
    to_property: BTreeMap<TaxonomyProvider, &'static str>,
    to_provider: BTreeMap<&'static str, TaxonomyProvider>,
}

/// Property of the "World Flora Online ID" scheme, which the federated
/// knowledge base does not classify as a taxon identifier scheme.
pub const WORLD_OF_FLORA_ONLINE_PROPERTY: &str = "P7715";

impl ProviderIdentifierMap {
    /// Tables for the Wikidata knowledge base.
    pub fn wikidata() -> Self {
        use TaxonomyProvider::*;
        let forward: [(TaxonomyProvider, &'static str); 18] = [
            (OpenTreeOfLife, "P9157"),
            (BoldTaxon, "P3606"),
            (IndexFungorum, "P1391"),
            (Itis, "P815"),
            (Ncbi, "P685"),
            (Eol, "P830"),
            (EolV2, "P830"),
            (Worms, "P850"),
            (InterimRegisterOfMarineAndNonmarineGenera, "P5055"),
            (FishbaseSpeccode, "P938"),
            (SealifebaseSpeccode, "P6018"),
            (Gbif, "P846"),
            (InaturalistTaxon, "P3151"),
            (Nbn, "P3240"),
            (Msw, "P959"),
            (Plazi, "P1992"),
            (CatalogueOfLife, "P10585"),
            (WorldOfFloraOnline, WORLD_OF_FLORA_ONLINE_PROPERTY),
        ];

        let to_property: BTreeMap<_, _> = forward.into_iter().collect();
        let mut to_provider = BTreeMap::new();
        for (provider, property) in forward {
            // first mapping wins, so P830 stays with EOL
            to_provider.entry(property).or_insert(provider);
        }
        Self {
            to_property,
            to_provider,
        }
    }

    pub fn property_for(&self, provider: TaxonomyProvider) -> Option<&'static str> {
        self.to_property.get(&provider).copied()
    }

    pub fn provider_for(&self, property: &str) -> Option<TaxonomyProvider> {
        self.to_provider.get(property).copied()
    }

    pub fn is_mapped(&self, provider: TaxonomyProvider) -> bool {
        self.to_property.contains_key(&provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = (TaxonomyProvider, &'static str)> + '_ {
        self.to_property.iter().map(|(p, v)| (*p, *v))
    }

    pub fn properties(&self) -> impl Iterator<Item = (&'static str, TaxonomyProvider)> + '_ {
        self.to_provider.iter().map(|(v, p)| (*v, *p))
    }
}

impl Default for ProviderIdentifierMap {
    fn default() -> Self {
        Self::wikidata()
    }
}
