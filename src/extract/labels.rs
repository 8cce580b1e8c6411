//! Row-label mapping.
//!
//! An ordered table of bilingual (English/Norwegian) pattern rules maps
//! normalized row labels onto financial fields. The table is data, not
//! control flow: rules are tried top to bottom, the first match wins, and
//! each rule may move the parse context into a new statement section.
//!
//! Two label families carry no meaning on their own and resolve through the
//! context instead: a bare growth label belongs to revenue unless the block
//! is inside its EBITDA section, and a bare margin label attaches to the
//! margin sibling of the last concrete field. This makes mapping strictly
//! order-dependent within a block: callers must feed rows in document order.

use crate::model::FinancialField;
use regex::Regex;
use std::sync::LazyLock;

/// Coarse statement areas used to disambiguate bare growth/margin labels.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Section {
    General,
    Revenue,
    Ebitda,
    CashFlow,
    Balance,
}

/// Mutable mapping state, reset per block.
#[derive(Debug)]
pub(crate) struct ParseContext {
    pub(crate) section: Section,
    pub(crate) last_field: Option<FinancialField>,
}

impl ParseContext {
    pub(crate) fn new() -> ParseContext {
        ParseContext {
            section: Section::General,
            last_field: None,
        }
    }
}

/// Outcome of mapping one label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum LabelMatch {
    /// The label maps to a field
    Field(FinancialField),
    /// The label is recognized but tracks no field (section headers, growth
    /// under EBITDA); not reported as unmapped
    Recognized,
    /// No rule matched
    Unknown,
}

struct LabelRule {
    pattern: Regex,
    field: Option<FinancialField>,
    section: Option<Section>,
}

fn rule(pattern: &str, field: Option<FinancialField>, section: Option<Section>) -> LabelRule {
    LabelRule {
        pattern: Regex::new(&format!("(?i){pattern}")).expect("Hardcode regex pattern"),
        field,
        section,
    }
}

static BARE_GROWTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[%\s]*(growth|vekst)(\s*(rate|y/y|yoy))?[%\s]*$").expect("Hardcode regex pattern")
});

static BARE_MARGIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[%\s]*-?\s*(margin|marginal)[%\s]*$").expect("Hardcode regex pattern")
});

/// The ordered rule table. Specific patterns come before the generic ones
/// they overlap with ("revenue growth" before "revenue", segment EBITDA
/// before blended EBITDA, "resultat før skatt" before "skatt").
static LABEL_RULES: LazyLock<Vec<LabelRule>> = LazyLock::new(|| {
    use FinancialField as F;
    use Section as S;
    vec![
        // statement section headers carrying no values of their own
        rule(r"^(income statement|profit (and|&) loss|p&l)$", None, Some(S::Revenue)),
        rule(r"^resultatregnskap$", None, Some(S::Revenue)),
        rule(r"^(cash ?flow( statement)?)$", None, Some(S::CashFlow)),
        rule(r"^kontantstrøm(soppstilling)?$", None, Some(S::CashFlow)),
        rule(r"^(balance( sheet)?|balanse)$", None, Some(S::Balance)),
        rule(r"^(equity bridge|ownership|eierstruktur|kapitalstruktur)$", None, Some(S::Balance)),

        // revenue
        rule(r"revenue growth|sales growth|growth in (net )?(revenue|sales)", Some(F::RevenueGrowth), Some(S::Revenue)),
        rule(r"omsetningsvekst|vekst i omsetning(en)?", Some(F::RevenueGrowth), Some(S::Revenue)),
        rule(r"annual recurring revenue|\barr\b", Some(F::AnnualRecurringRevenue), Some(S::Revenue)),
        rule(r"recurring revenue|gjentakende inntekt(er)?|repeterende inntekt(er)?", Some(F::RecurringRevenue), Some(S::Revenue)),
        rule(r"revenue|net sales|\bsales\b|turnover", Some(F::Revenue), Some(S::Revenue)),
        rule(r"omsetning|driftsinntekt(er)?|salgsinntekt(er)?", Some(F::Revenue), Some(S::Revenue)),

        // gross profit
        rule(r"gross margin|bruttomargin", Some(F::GrossMargin), Some(S::Revenue)),
        rule(r"gross profit|bruttofortjeneste|bruttoresultat", Some(F::GrossProfit), Some(S::Revenue)),

        // operating costs
        rule(r"personnel (cost|expense)s?|salar(y|ies)|payroll", Some(F::PersonnelCosts), None),
        rule(r"lønnskostnad(er)?|personalkostnad(er)?", Some(F::PersonnelCosts), None),
        rule(r"other operating (cost|expense)s?|andre driftskostnad(er)?", Some(F::OtherOperatingExpenses), None),
        rule(r"operating (cost|expense)s?|\bopex\b|driftskostnad(er)?", Some(F::OperatingExpenses), None),

        // ratio rows mentioning EBITDA, ahead of the EBITDA family
        rule(r"leverage|net debt ?/ ?ebitda|gjeldsgrad", Some(F::Leverage), None),
        // a bare multiple row is a deal assumption, not a period field
        rule(r"ev ?/ ?ebitda|ebitda multiple|multippel", None, None),

        // EBITDA, segments before the blended figure
        rule(r"ebitda[ -]?margin|ebitda %", Some(F::EbitdaMargin), Some(S::Ebitda)),
        rule(r"managed services margin|ms[- ]margin", Some(F::EbitdaManagedServicesMargin), Some(S::Ebitda)),
        rule(r"consulting margin|rådgivningsmargin", Some(F::EbitdaConsultingMargin), Some(S::Ebitda)),
        rule(r"software margin|lisensmargin", Some(F::EbitdaSoftwareMargin), Some(S::Ebitda)),
        rule(r"ebitda.*(managed services|\bms\b)|managed services.*ebitda", Some(F::EbitdaManagedServices), Some(S::Ebitda)),
        rule(r"ebitda.*(consulting|rådgivning)|consulting.*ebitda|rådgivning.*ebitda", Some(F::EbitdaConsulting), Some(S::Ebitda)),
        rule(r"ebitda.*(software|license|lisens)|software.*ebitda|lisens.*ebitda", Some(F::EbitdaSoftware), Some(S::Ebitda)),
        rule(r"ebitda", Some(F::Ebitda), Some(S::Ebitda)),

        // depreciation & amortization
        rule(r"depreciation|avskrivning(er)?", Some(F::Depreciation), None),
        rule(r"amorti[sz]ation|amortisering", Some(F::Amortization), None),

        // EBIT
        rule(r"ebit[ -]?margin", Some(F::EbitMargin), None),
        rule(r"\bebit\b|operating (profit|income|result)|driftsresultat", Some(F::Ebit), None),

        // below EBIT
        rule(r"net financial (items|expenses)|financial items|interest (expense|cost)s?", Some(F::NetFinancialItems), None),
        rule(r"finansposter|netto finans(poster|kostnad(er)?)?|rentekostnad(er)?", Some(F::NetFinancialItems), None),
        rule(r"(profit|result|earnings) before tax|pre[- ]?tax (profit|income)|\bebt\b", Some(F::ProfitBeforeTax), None),
        rule(r"resultat før skatt", Some(F::ProfitBeforeTax), None),
        rule(r"income tax(es)?|cash tax(es)?|^tax(es)?( paid| payable)?$", Some(F::Tax), None),
        rule(r"betalbar skatt|skattekostnad|^skatt$", Some(F::Tax), None),
        rule(r"net (income|profit|result)|profit after tax", Some(F::NetIncome), None),
        rule(r"årsresultat|resultat etter skatt", Some(F::NetIncome), None),

        // cash flow
        rule(r"\bcapex\b|capital expenditures?|investeringer( i driftsmidler)?", Some(F::Capex), Some(S::CashFlow)),
        rule(r"(change|endring).*(working capital|arbeidskapital|\bnwc\b)", Some(F::ChangeInWorkingCapital), Some(S::CashFlow)),
        rule(r"net working capital|working capital|arbeidskapital|\bnwc\b", Some(F::NetWorkingCapital), Some(S::CashFlow)),
        rule(r"operat(ing|ional) cash ?flow|cash ?flow from operations|kontantstrøm fra drift(en)?", Some(F::OperatingCashFlow), Some(S::CashFlow)),
        rule(r"free cash ?flow|\bfcf\b|fri kontantstrøm", Some(F::FreeCashFlow), Some(S::CashFlow)),
        rule(r"cash conversion|kontantkonvertering", Some(F::CashConversion), Some(S::CashFlow)),
        rule(r"dividends?( paid)?|utbytte", Some(F::DividendsPaid), Some(S::CashFlow)),

        // debt and equity bridge
        rule(r"^cash( and cash equivalents| balance| position)?$", Some(F::Cash), Some(S::Balance)),
        rule(r"bankinnskudd|likvide midler|kontantbeholdning", Some(F::Cash), Some(S::Balance)),
        rule(r"gross (interest[- ]bearing )?debt|total debt|bruttogjeld", Some(F::GrossDebt), Some(S::Balance)),
        rule(r"net (interest[- ]bearing )?debt|nettogjeld|netto rentebærende gjeld|\bnibd\b", Some(F::NetDebt), Some(S::Balance)),
        rule(r"rentebærende gjeld", Some(F::GrossDebt), Some(S::Balance)),
        rule(r"enterprise value|selskapsverdi|\bev\b", Some(F::EnterpriseValue), Some(S::Balance)),
        rule(r"equity value|egenkapitalverdi|market cap(italization)?", Some(F::EquityValue), Some(S::Balance)),
        rule(r"preferred (equity|capital)|preference (shares|capital)|preferanse(aksjer|kapital)", Some(F::PreferredEquity), Some(S::Balance)),
        rule(r"shareholder loans?|aksjonærlån", Some(F::ShareholderLoans), Some(S::Balance)),
        rule(r"minority interests?|non[- ]?controlling interests?|minoritetsinteresser?", Some(F::MinorityInterest), Some(S::Balance)),
        rule(r"transaction costs?|transaksjonskostnad(er)?", Some(F::TransactionCosts), Some(S::Balance)),

        // shares and headcount
        rule(r"(fully )?diluted shares( outstanding)?|utvannede aksjer", Some(F::DilutedShares), None),
        rule(r"shares outstanding|number of shares|antall aksjer|utestående aksjer", Some(F::SharesOutstanding), None),
        rule(r"\bftes?\b|full[- ]?time employees|^employees$|antall ansatte|årsverk", Some(F::FullTimeEmployees), None),
    ]
});

/// Normalizes a raw label: lowercases, collapses whitespace, strips leading
/// bullets and trailing punctuation and quotes.
pub(crate) fn normalize_label(label: &str) -> String {
    let collapsed = label
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_start_matches(&['-', '•', '–', '*', '·'][..])
        .trim_end_matches(&[':', ';', ',', '.', '?'][..])
        .trim_matches(&['\'', '"'][..])
        .trim()
        .to_owned()
}

/// Maps one normalized row label onto a field, updating the context.
///
/// Must be called in document row order within a block: bare growth and
/// margin labels resolve against what came before them.
pub(crate) fn map_label(label: &str, context: &mut ParseContext) -> LabelMatch {
    let label = normalize_label(label);
    if label.is_empty() {
        return LabelMatch::Unknown;
    }

    if BARE_GROWTH.is_match(&label) {
        // no tracked growth field exists under EBITDA
        return match context.section {
            Section::Ebitda => LabelMatch::Recognized,
            _ => LabelMatch::Field(FinancialField::RevenueGrowth),
        };
    }
    if BARE_MARGIN.is_match(&label) {
        let field = context
            .last_field
            .and_then(|field| field.margin_sibling())
            .unwrap_or(FinancialField::EbitdaMargin);
        return LabelMatch::Field(field);
    }

    for rule in LABEL_RULES.iter() {
        if rule.pattern.is_match(&label) {
            if let Some(section) = rule.section {
                context.section = section;
            }
            return match rule.field {
                Some(field) => {
                    context.last_field = Some(field);
                    LabelMatch::Field(field)
                }
                None => LabelMatch::Recognized,
            };
        }
    }
    LabelMatch::Unknown
}
