//! Simulated market description.
//!
//! [`RiskFactorSchema`] holds the ordered lists that define which risk
//! factors a simulation run produced: currencies, indices, the curve tenor
//! grid, FX-volatility expiries and the swaption-volatility expiry × term
//! grid, plus the simulation date grid. It is parsed once from the
//! simulation configuration and shared read-only by every snapshot build.
//!
//! ## Positional Invariant
//!
//! The position of an entry in its list is the suffix used in the scenario
//! dump: `curve_tenors[i]` pairs with `DiscountCurve/<CCY>/<i>`. Swaption
//! volatilities are flattened as `expiry · terms.len() + term`.
//!
//! ## Configuration Layout
//!
//! ```xml
//! <Simulation>
//!   <Parameters><Grid>40,3M</Grid></Parameters>
//!   <Market>
//!     <BaseCurrency>EUR</BaseCurrency>
//!     <Currencies><Currency>EUR</Currency><Currency>USD</Currency></Currencies>
//!     <YieldCurves><Configuration><Tenors>3M,1Y,5Y</Tenors></Configuration></YieldCurves>
//!     <Indices><Index>EUR-EURIBOR-6M</Index></Indices>
//!     <FxVolatilities><Expiries>6M,1Y</Expiries></FxVolatilities>
//!     <SwaptionVolatilities><Expiries>1Y</Expiries><Terms>5Y,10Y</Terms></SwaptionVolatilities>
//!   </Market>
//! </Simulation>
//! ```

pub mod keys;
mod xml;

use std::path::Path;

use crate::types::{DateGrid, SchemaError};
use xml::XmlNodes;

const NODE_GRID: &str = "Parameters/Grid";
const NODE_BASE_CURRENCY: &str = "Market/BaseCurrency";
const NODE_CURRENCIES: &str = "Market/Currencies";
const NODE_CURRENCY: &str = "Market/Currencies/Currency";
const NODE_INDICES: &str = "Market/Indices";
const NODE_INDEX: &str = "Market/Indices/Index";
const NODE_CURVE_TENORS: &str = "Market/YieldCurves/Configuration/Tenors";
const NODE_FX_VOL_EXPIRIES: &str = "Market/FxVolatilities/Expiries";
const NODE_SWAPTION_EXPIRIES: &str = "Market/SwaptionVolatilities/Expiries";
const NODE_SWAPTION_TERMS: &str = "Market/SwaptionVolatilities/Terms";

/// Immutable description of the simulated market.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskFactorSchema {
    base_currency: String,
    currencies: Vec<String>,
    indices: Vec<String>,
    curve_tenors: Vec<String>,
    fx_vol_expiries: Vec<String>,
    swaption_expiries: Vec<String>,
    swaption_terms: Vec<String>,
    grid: DateGrid,
}

/// One scenario factor implied by the schema, with the labels needed to
/// render it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaFactor<'a> {
    /// Discount factor of a currency's curve at a tenor.
    Discount {
        /// Curve currency
        currency: &'a str,
        /// Tenor label
        tenor: &'a str,
        /// Position in `curve_tenors`
        position: usize,
    },
    /// Discount factor of an index forwarding curve at a tenor.
    IndexCurve {
        /// Index name, e.g. `EUR-EURIBOR-6M`
        index: &'a str,
        /// Tenor label
        tenor: &'a str,
        /// Position in `curve_tenors`
        position: usize,
    },
    /// FX spot of a non-base currency in base-currency units.
    FxSpot {
        /// Foreign currency
        currency: &'a str,
        /// Base currency
        base: &'a str,
    },
    /// ATM FX volatility of a non-base currency pair at an expiry.
    FxVolatility {
        /// Foreign currency
        currency: &'a str,
        /// Base currency
        base: &'a str,
        /// Expiry label
        expiry: &'a str,
        /// Position in `fx_vol_expiries`
        position: usize,
    },
    /// ATM swaption volatility of a currency at expiry × term.
    SwaptionVolatility {
        /// Currency
        currency: &'a str,
        /// Option expiry label
        expiry: &'a str,
        /// Underlying swap term label
        term: &'a str,
        /// Flattened position `expiry · terms + term`
        position: usize,
    },
}

impl SchemaFactor<'_> {
    /// Scenario dump key of this factor.
    pub fn scenario_key(&self) -> String {
        match *self {
            SchemaFactor::Discount {
                currency, position, ..
            } => keys::discount_curve(currency, position),
            SchemaFactor::IndexCurve {
                index, position, ..
            } => keys::index_curve(index, position),
            SchemaFactor::FxSpot { currency, base } => keys::fx_spot(currency, base),
            SchemaFactor::FxVolatility {
                currency,
                base,
                position,
                ..
            } => keys::fx_volatility(currency, base, position),
            SchemaFactor::SwaptionVolatility {
                currency, position, ..
            } => keys::swaption_volatility(currency, position),
        }
    }
}

impl RiskFactorSchema {
    /// Starts a programmatic schema definition.
    pub fn builder() -> RiskFactorSchemaBuilder {
        RiskFactorSchemaBuilder::default()
    }

    /// Parses a simulation configuration document.
    ///
    /// # Errors
    ///
    /// `SchemaError::MissingNode` when any required list node or the date
    /// grid is absent; `SchemaError::Xml` for malformed XML.
    pub fn from_xml(xml: &str) -> Result<Self, SchemaError> {
        let nodes = XmlNodes::parse(xml)?;

        for node in [
            NODE_GRID,
            NODE_CURRENCIES,
            NODE_INDICES,
            NODE_CURVE_TENORS,
            NODE_FX_VOL_EXPIRIES,
            NODE_SWAPTION_EXPIRIES,
            NODE_SWAPTION_TERMS,
        ] {
            nodes.require(node)?;
        }

        let grid_spec = nodes
            .text(NODE_GRID)
            .ok_or_else(|| SchemaError::MissingNode(NODE_GRID.to_string()))?;

        let mut builder = RiskFactorSchema::builder()
            .currencies(nodes.elements(NODE_CURRENCY))
            .indices(nodes.elements(NODE_INDEX))
            .curve_tenors(nodes.list(NODE_CURVE_TENORS))
            .fx_vol_expiries(nodes.list(NODE_FX_VOL_EXPIRIES))
            .swaption_expiries(nodes.list(NODE_SWAPTION_EXPIRIES))
            .swaption_terms(nodes.list(NODE_SWAPTION_TERMS))
            .grid_spec(grid_spec);

        if let Some(base) = nodes.text(NODE_BASE_CURRENCY) {
            builder = builder.base_currency(base);
        }

        builder.build()
    }

    /// Reads and parses a simulation configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let schema = Self::from_xml(&xml)?;
        tracing::debug!(
            path = %path.display(),
            currencies = schema.currencies.len(),
            indices = schema.indices.len(),
            tenors = schema.curve_tenors.len(),
            grid_dates = schema.grid.len(),
            "Loaded risk factor schema"
        );
        Ok(schema)
    }

    /// Base (reporting) currency.
    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Simulated currencies, base included.
    pub fn currencies(&self) -> &[String] {
        &self.currencies
    }

    /// Simulated currencies other than the base currency, in schema order.
    pub fn non_base_currencies(&self) -> impl Iterator<Item = &str> + '_ {
        self.currencies
            .iter()
            .map(String::as_str)
            .filter(move |ccy| *ccy != self.base_currency)
    }

    /// Simulated index names.
    pub fn indices(&self) -> &[String] {
        &self.indices
    }

    /// Curve tenor labels shared by discount and index curves.
    pub fn curve_tenors(&self) -> &[String] {
        &self.curve_tenors
    }

    /// FX-volatility expiry labels.
    pub fn fx_vol_expiries(&self) -> &[String] {
        &self.fx_vol_expiries
    }

    /// Swaption-volatility expiry labels.
    pub fn swaption_expiries(&self) -> &[String] {
        &self.swaption_expiries
    }

    /// Swaption-volatility term labels.
    pub fn swaption_terms(&self) -> &[String] {
        &self.swaption_terms
    }

    /// Simulation date grid.
    pub fn grid(&self) -> &DateGrid {
        &self.grid
    }

    /// Every scenario factor the schema implies, in rendering order:
    /// discount curves, index curves, FX spots, FX vols, swaption vols.
    pub fn factors(&self) -> Vec<SchemaFactor<'_>> {
        let mut factors = Vec::new();
        let base = self.base_currency.as_str();

        for currency in &self.currencies {
            for (position, tenor) in self.curve_tenors.iter().enumerate() {
                factors.push(SchemaFactor::Discount {
                    currency,
                    tenor,
                    position,
                });
            }
        }

        for index in &self.indices {
            for (position, tenor) in self.curve_tenors.iter().enumerate() {
                factors.push(SchemaFactor::IndexCurve {
                    index,
                    tenor,
                    position,
                });
            }
        }

        for currency in self.non_base_currencies() {
            factors.push(SchemaFactor::FxSpot { currency, base });
        }

        for currency in self.non_base_currencies() {
            for (position, expiry) in self.fx_vol_expiries.iter().enumerate() {
                factors.push(SchemaFactor::FxVolatility {
                    currency,
                    base,
                    expiry,
                    position,
                });
            }
        }

        let n_terms = self.swaption_terms.len();
        for currency in &self.currencies {
            for (i, expiry) in self.swaption_expiries.iter().enumerate() {
                for (j, term) in self.swaption_terms.iter().enumerate() {
                    factors.push(SchemaFactor::SwaptionVolatility {
                        currency,
                        expiry,
                        term,
                        position: i * n_terms + j,
                    });
                }
            }
        }

        factors
    }

    /// Scenario dump keys of [`RiskFactorSchema::factors`].
    pub fn factor_keys(&self) -> Vec<String> {
        self.factors().iter().map(SchemaFactor::scenario_key).collect()
    }
}

/// Builder for [`RiskFactorSchema`].
#[derive(Clone, Debug, Default)]
pub struct RiskFactorSchemaBuilder {
    base_currency: Option<String>,
    currencies: Vec<String>,
    indices: Vec<String>,
    curve_tenors: Vec<String>,
    fx_vol_expiries: Vec<String>,
    swaption_expiries: Vec<String>,
    swaption_terms: Vec<String>,
    grid_spec: Option<String>,
}

fn trimmed<I, S>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    entries
        .into_iter()
        .map(|entry| entry.into().trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

impl RiskFactorSchemaBuilder {
    /// Sets the base currency (defaults to the first currency).
    pub fn base_currency(mut self, currency: impl Into<String>) -> Self {
        self.base_currency = Some(currency.into().trim().to_string());
        self
    }

    /// Sets the simulated currencies.
    pub fn currencies<I, S>(mut self, currencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.currencies = trimmed(currencies);
        self
    }

    /// Sets the simulated index names.
    pub fn indices<I, S>(mut self, indices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.indices = trimmed(indices);
        self
    }

    /// Sets the curve tenor labels.
    pub fn curve_tenors<I, S>(mut self, tenors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.curve_tenors = trimmed(tenors);
        self
    }

    /// Sets the FX-volatility expiry labels.
    pub fn fx_vol_expiries<I, S>(mut self, expiries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fx_vol_expiries = trimmed(expiries);
        self
    }

    /// Sets the swaption-volatility expiry labels.
    pub fn swaption_expiries<I, S>(mut self, expiries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.swaption_expiries = trimmed(expiries);
        self
    }

    /// Sets the swaption-volatility term labels.
    pub fn swaption_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.swaption_terms = trimmed(terms);
        self
    }

    /// Sets the date grid specification (`40,3M` or `6M,1Y,2Y`).
    pub fn grid_spec(mut self, spec: impl Into<String>) -> Self {
        self.grid_spec = Some(spec.into());
        self
    }

    /// Validates and freezes the schema.
    pub fn build(self) -> Result<RiskFactorSchema, SchemaError> {
        let grid_spec = self
            .grid_spec
            .ok_or_else(|| SchemaError::MissingNode(NODE_GRID.to_string()))?;
        let grid = DateGrid::parse(&grid_spec).map_err(|e| SchemaError::InvalidEntry {
            node: NODE_GRID.to_string(),
            value: grid_spec.clone(),
            reason: e.to_string(),
        })?;

        let first = self.currencies.first().ok_or(SchemaError::NoCurrencies)?;
        let base_currency = self.base_currency.unwrap_or_else(|| first.clone());
        if !self.currencies.contains(&base_currency) {
            return Err(SchemaError::UnknownBaseCurrency(base_currency));
        }

        Ok(RiskFactorSchema {
            base_currency,
            currencies: self.currencies,
            indices: self.indices,
            curve_tenors: self.curve_tenors,
            fx_vol_expiries: self.fx_vol_expiries,
            swaption_expiries: self.swaption_expiries,
            swaption_terms: self.swaption_terms,
            grid,
        })
    }
}
