//! Distribution, ranking and per-company statistics behind the dashboard endpoints

use crate::analytics::dataset::{number_value, Company, Dataset};
use crate::analytics::{mean, round_stat};
use crate::categorize_company_size;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

const STOP_WORDS: [&str; 8] = ["and", "the", "to", "of", "in", "for", "a", "an"];
const WORDCLOUD_SIZE: usize = 100;
pub const TOP_BY_FOLLOWERS: usize = 20;

fn value_counts<'a>(values: impl Iterator<Item = Option<&'a str>>) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in values.flatten() {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Companies bucketed by LinkedIn headcount; companies without a headcount are not counted
pub fn company_size_distribution(dataset: &Dataset) -> BTreeMap<&'static str, usize> {
    let mut distribution = BTreeMap::new();
    for size in dataset
        .companies
        .iter()
        .filter_map(|c| c.company_size_on_linkedin)
    {
        *distribution.entry(categorize_company_size(size)).or_insert(0) += 1;
    }
    distribution
}

pub fn industry_breakdown(dataset: &Dataset) -> BTreeMap<String, usize> {
    value_counts(dataset.companies.iter().map(|c| c.industry.as_deref()))
}

pub fn company_type_distribution(dataset: &Dataset) -> BTreeMap<String, usize> {
    value_counts(dataset.companies.iter().map(|c| c.company_type.as_deref()))
}

pub fn follower_counts(dataset: &Dataset) -> Vec<Value> {
    dataset
        .companies
        .iter()
        .filter_map(|c| c.follower_count.and_then(number_value))
        .collect()
}

/// Count of companies per founding year, ascending
pub fn founded_year_timeline(dataset: &Dataset) -> BTreeMap<i64, usize> {
    let mut timeline = BTreeMap::new();
    for year in dataset.companies.iter().filter_map(|c| c.founded_year) {
        *timeline.entry(year as i64).or_insert(0) += 1;
    }
    timeline
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedCompany {
    pub name: Option<String>,
    pub follower_count: Option<Value>,
    pub industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowerCount {
    pub name: Option<String>,
    pub follower_count: Option<Value>,
}

fn by_followers_desc(dataset: &Dataset) -> Vec<&Company> {
    let mut companies: Vec<&Company> = dataset.companies.iter().collect();
    // Stable sort, missing follower counts last
    companies.sort_by(|a, b| match (a.follower_count, b.follower_count) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    companies
}

/// Top 20 companies by follower count, with their industry
pub fn top_companies_by_followers(dataset: &Dataset) -> Vec<RankedCompany> {
    by_followers_desc(dataset)
        .into_iter()
        .take(TOP_BY_FOLLOWERS)
        .map(|c| RankedCompany {
            name: c.name.clone(),
            follower_count: c.follower_count.and_then(number_value),
            industry: c.industry.clone(),
        })
        .collect()
}

/// The `n` largest follower counts; companies without one are excluded
pub fn top_companies_followers(dataset: &Dataset, n: usize) -> Vec<FollowerCount> {
    by_followers_desc(dataset)
        .into_iter()
        .filter(|c| c.follower_count.is_some())
        .take(n)
        .map(|c| FollowerCount {
            name: c.name.clone(),
            follower_count: c.follower_count.and_then(number_value),
        })
        .collect()
}

fn punctuation() -> &'static Regex {
    static PUNCTUATION: OnceLock<Regex> = OnceLock::new();
    PUNCTUATION.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid punctuation pattern"))
}

/// Most frequent specialty words, stop words removed.
/// Ties keep the order in which words first appear.
pub fn specialties_wordcloud(dataset: &Dataset) -> BTreeMap<String, usize> {
    let all_specialties = dataset
        .companies
        .iter()
        .filter_map(|c| c.specialities.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let cleaned = punctuation().replace_all(&all_specialties, "");

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for word in cleaned.split_whitespace() {
        if STOP_WORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(WORDCLOUD_SIZE)
        .map(|word| (word.to_string(), counts[word]))
        .collect()
}

/// Funding rounds and total funding for companies that report both
pub fn funding_analysis(dataset: &Dataset) -> Vec<BTreeMap<&'static str, Value>> {
    dataset
        .companies
        .iter()
        .filter_map(|c| {
            let name = c.name.clone()?;
            let rounds = c.extra_number_of_funding_rounds.clone()?;
            let amount = c.extra_total_funding_amount.clone()?;
            Some(BTreeMap::from([
                ("name", Value::String(name)),
                ("extra_number_of_funding_rounds", rounds),
                ("extra_total_funding_amount", amount),
            ]))
        })
        .collect()
}

/// Headcount range against follower count, where both are known
pub fn employee_follower_correlation(dataset: &Dataset) -> Vec<BTreeMap<&'static str, Value>> {
    dataset
        .companies
        .iter()
        .filter_map(|c| {
            let size = c.company_size.clone()?;
            let followers = number_value(c.follower_count?)?;
            Some(BTreeMap::from([
                ("company_size", size),
                ("follower_count", followers),
            ]))
        })
        .collect()
}

pub fn company_names(dataset: &Dataset) -> Vec<String> {
    dataset
        .companies
        .iter()
        .filter_map(|c| c.name.clone())
        .collect()
}

/// Number of comma-separated specialties
pub fn count_specialties(specialities: Option<&str>) -> usize {
    specialities.map(|s| s.split(',').count()).unwrap_or(0)
}

/// Distinct countries in a `locations` cell.
/// A JSON list counts distinct `country` values, other JSON counts as one location,
/// and non-JSON text counts distinct comma-separated parts.
pub fn count_countries(locations: Option<&str>) -> usize {
    let Some(text) = locations else {
        return 0;
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_object()?.get("country"))
            .map(Value::to_string)
            .collect::<HashSet<_>>()
            .len(),
        Ok(_) => 1,
        Err(_) => text.split(',').collect::<HashSet<_>>().len(),
    }
}

fn truncate(value: Option<f64>) -> Option<i64> {
    value.map(|v| v.trunc() as i64)
}

fn column_mean(dataset: &Dataset, column: impl Fn(&Company) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = dataset.companies.iter().filter_map(column).collect();
    mean(&values)
}

/// One company compared against dataset averages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyDetails {
    pub name: Option<String>,
    pub industry: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub follower_count: Option<i64>,
    pub avg_follower_count: Option<i64>,
    pub company_size: Option<i64>,
    pub avg_company_size: Option<i64>,
    pub founded_year: Option<i64>,
    pub avg_founded_year: Option<i64>,
    pub num_specialties: usize,
    pub avg_num_specialties: i64,
    pub num_countries: usize,
    pub avg_num_countries: i64,
    #[serde(rename = "Image_Path")]
    pub image_path: Option<String>,
}

/// Details for the first company whose name matches exactly
pub fn company_details(dataset: &Dataset, name: &str) -> Option<CompanyDetails> {
    let company = dataset
        .companies
        .iter()
        .find(|c| c.name.as_deref() == Some(name))?;

    let specialty_counts: Vec<f64> = dataset
        .companies
        .iter()
        .map(|c| count_specialties(c.specialities.as_deref()) as f64)
        .collect();
    let country_counts: Vec<f64> = dataset
        .companies
        .iter()
        .map(|c| count_countries(c.locations.as_deref()) as f64)
        .collect();

    Some(CompanyDetails {
        name: company.name.clone(),
        industry: company.industry.clone(),
        description: company.description.clone(),
        website: company.website.clone(),
        follower_count: truncate(company.follower_count),
        avg_follower_count: truncate(column_mean(dataset, |c| c.follower_count)),
        company_size: truncate(company.company_size_on_linkedin),
        avg_company_size: truncate(column_mean(dataset, |c| c.company_size_on_linkedin)),
        founded_year: truncate(company.founded_year),
        avg_founded_year: truncate(column_mean(dataset, |c| c.founded_year)),
        num_specialties: count_specialties(company.specialities.as_deref()),
        avg_num_specialties: round_stat(mean(&specialty_counts)),
        num_countries: count_countries(company.locations.as_deref()),
        avg_num_countries: round_stat(mean(&country_counts)),
        image_path: company.image_path.clone(),
    })
}
