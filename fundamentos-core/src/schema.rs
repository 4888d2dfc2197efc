//! Indicator schema — long-form Portuguese indicator names to short codes.
//!
//! The table is treated as exhaustive for a source: a scraped label with no
//! entry is an error carrying the label, so the table can be extended.
//! Schemas are plain immutable values; tests can build partial ones with
//! [`IndicatorSchema::from_pairs`].

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::FetchError;

/// Indicators published on ADVFN's fundamentals pages, as `(long name, short code)`.
pub const ADVFN_INDICATORS: &[(&str, &str)] = &[
    ("Quantidade de Ações ON", "Quantidade de Ações ON"),
    ("Quantidade de Ações PN", "Quantidade de Ações PN"),
    ("Última Cotação ON", "Última Cotação ON"),
    ("Última Cotação PN", "Última Cotação PN"),
    ("Valor de Mercado", "Valor de Mercado"),
    ("Receita Líquida", "Receita Líquida"),
    ("Price Sales Ratio (PSR)", "PSR"),
    ("Resultado Bruto", "Resultado Bruto"),
    ("Margem Bruta", "Margem Bruta"),
    ("EBITDA", "EBITDA"),
    ("Margem EBITDA", "Margem EBITDA"),
    ("Preço / EBITDA", "P/EBITDA"),
    ("EBIT", "EBIT"),
    ("Margem EBIT", "Margem EBIT"),
    ("Preço / EBIT", "P/EBIT"),
    ("Lucro/Prejuízo Líquido", "Lucro Líquido"),
    ("Preço / Lucro (P/L)", "P/L"),
    ("Lucro por Ação (LPA)", "LPA"),
    ("Ativo Total", "Ativo Total"),
    ("Preço / Ativo (P/A)", "P/Ativo"),
    ("Giro Ativos", "Giro"),
    ("EBIT / Ativo", "EBIT/Ativo"),
    ("Patrimônio Líquido", "PL"),
    ("Retorno sobre PL (ROE)", "ROE"),
    ("Valor Patrimonial por Ação (VPA)", "VPA"),
    ("Preço / Valor Patrimonial por Ação (P/VPA)", "P/VPA"),
    ("(Ativo - Patrimônio Líquido) / Patrimônio Líquido", "(A - PL)/PL"),
    ("Equity Multiplier (EM)", "EM"),
    ("Disponibilidades", "Disponibilidades"),
    ("Dinheiro em Caixa", "Dinheiro em Caixa"),
    ("Aplicações Financeiras", "Aplicações Financeiras"),
    ("Dívida Bruta", "Dívida Bruta"),
    ("Dívida Bruta / Patrimônio Líquido", "DB/PL"),
    ("Endividamento Financeiro", "Endividamento Financeiro"),
    ("Dívida Líquida", "Dívida Líquida"),
    ("Dívida Líquida / EBITDA", "DL/EBITDA"),
    ("Enterprise Value (EV)", "EV"),
    ("Enterprise Value / EBIT (EV/EBIT)", "EV/EBIT"),
    ("Ativo Circulante", "Ativo Circulante"),
    ("Ativo Não Circulante", "Ativo Não Circulante"),
    ("Ativo Circulante Líquido", "Ativo Circulante Líquido"),
    ("Preço / Ativo Circulante Líquido", "P/ACL"),
    ("Passivo Circulante", "Passivo Circulante"),
    ("Passivo Não Circulante", "Passivo Não Circulante"),
    ("Liquidez Corrente", "LC"),
    ("Liquidez Imediata", "LI"),
    ("Capital de Giro", "Capital de Giro"),
    ("Preço / Capital de Giro", "P/Capital de Giro"),
    ("Dívida em Moeda Estrangeira", "Dívida em Moeda Estrangeira"),
    ("Fluxo de Caixa Operacional (FCO)", "FCO"),
    ("Fluxo de Caixa de Investimentos (FCI)", "FCI"),
    ("Fluxo de Caixa de Financiamentos (FCF)", "FCF"),
    ("Fluxo de Caixa Total (FCT)", "FCT"),
    ("Fluxo de Caixa Livre (FCL)", "FCL"),
    ("CAPEX", "CAPEX"),
    ("Fluxo de Caixa Livre CAPEX", "FCL CAPEX"),
    ("CAPEX / Fluxo de Caixa Operacional", "CAPEX/FCO"),
    ("Fluxo de Caixa de Investimentos / Lucro Líquido", "FCI/LL"),
    ("CAPEX / Lucro Líquido", "CAPEX/LL"),
    (
        "Dividendos e Juros Sobre Capital Próprio Pagos",
        "Dividendos e JCP",
    ),
    ("Dividend Yield", "DY"),
    ("Dividend Payout", "Payout"),
];

/// Immutable lookup between long indicator names and short codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSchema {
    entries: Vec<(String, String)>,
    by_long: HashMap<String, usize>,
    by_short: HashMap<String, usize>,
}

impl IndicatorSchema {
    /// Build a schema from `(long name, short code)` pairs. Later pairs win on conflicts.
    pub fn from_pairs<I, L, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, S)>,
        L: Into<String>,
        S: Into<String>,
    {
        let entries: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(l, s)| (l.into(), s.into()))
            .collect();
        let by_long = entries
            .iter()
            .enumerate()
            .map(|(i, (l, _))| (l.clone(), i))
            .collect();
        let by_short = entries
            .iter()
            .enumerate()
            .map(|(i, (_, s))| (s.clone(), i))
            .collect();
        Self {
            entries,
            by_long,
            by_short,
        }
    }

    /// Shared ADVFN schema.
    pub fn advfn() -> &'static IndicatorSchema {
        static SCHEMA: OnceLock<IndicatorSchema> = OnceLock::new();
        SCHEMA.get_or_init(|| IndicatorSchema::from_pairs(ADVFN_INDICATORS.iter().copied()))
    }

    /// Short code for a long indicator name. Surrounding whitespace is ignored.
    pub fn map_label(&self, long_label: &str) -> Result<&str, FetchError> {
        self.by_long
            .get(long_label.trim())
            .map(|&i| self.entries[i].1.as_str())
            .ok_or_else(|| FetchError::UnknownIndicator {
                label: long_label.to_string(),
            })
    }

    /// Full description of a short code (the inverse mapping).
    pub fn describe(&self, short_code: &str) -> Option<&str> {
        self.by_short
            .get(short_code)
            .map(|&i| self.entries[i].0.as_str())
    }

    /// `(long name, short code)` pairs in table order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, s)| (l.as_str(), s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map a label with the shared ADVFN schema.
pub fn map_label(long_label: &str) -> Result<&'static str, FetchError> {
    IndicatorSchema::advfn().map_label(long_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_labels() {
        assert_eq!(map_label("Preço / Lucro (P/L)").unwrap(), "P/L");
        assert_eq!(map_label("Dividend Yield").unwrap(), "DY");
        assert_eq!(map_label("EBITDA").unwrap(), "EBITDA");
    }

    #[test]
    fn unknown_label_is_an_error_with_payload() {
        match map_label("Not A Real Label") {
            Err(FetchError::UnknownIndicator { label }) => assert_eq!(label, "Not A Real Label"),
            other => panic!("expected UnknownIndicator, got {other:?}"),
        }
    }

    #[test]
    fn inverse_lookup() {
        let schema = IndicatorSchema::advfn();
        assert_eq!(schema.describe("P/VPA"), Some("Preço / Valor Patrimonial por Ação (P/VPA)"));
        assert_eq!(schema.describe("nope"), None);
    }

    #[test]
    fn short_codes_are_unique() {
        let schema = IndicatorSchema::advfn();
        assert_eq!(schema.len(), ADVFN_INDICATORS.len());
        for (long, short) in schema.entries() {
            assert_eq!(schema.describe(short), Some(long));
        }
    }

    #[test]
    fn partial_schema_double() {
        let schema = IndicatorSchema::from_pairs([("Margem Bruta", "MB")]);
        assert_eq!(schema.map_label(" Margem Bruta ").unwrap(), "MB");
        assert!(schema.map_label("EBIT").is_err());
    }
}
