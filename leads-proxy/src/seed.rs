//! Deterministic seed dataset used to (re)populate a data backend.

use serde::{Deserialize, Serialize};

/// Number of generated campaigns
pub const CAMPAIGN_COUNT: usize = 15;
/// Leads generated per campaign
pub const LEADS_PER_CAMPAIGN: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub title: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub account_number: String,
    pub industry: String,
    pub website: String,
    pub phone: String,
    pub contacts: Vec<Contact>,
}

/// A campaign lead or a row of the flattened contact index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedData {
    pub customers: Vec<Customer>,
    #[serde(rename = "Leads")]
    pub leads: Vec<Lead>,
}

impl SeedData {
    /// Campaign leads followed by the flattened contact index
    pub fn build() -> Self {
        let customers = build_customers();
        let mut leads = build_campaign_leads();
        leads.extend(build_contact_index(&customers));
        Self { customers, leads }
    }
}

// (id, name, domain, industry, [(first, last, title); 2])
type CustomerRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    [(&'static str, &'static str, &'static str); 2],
);

const CUSTOMERS: [CustomerRow; 10] = [
    ("1", "Acme Analytics", "acme", "Technology",
        [("Lena", "Torres", "IT Director"), ("Marcus", "Ng", "Solutions Architect")]),
    ("2", "Apex Financial", "apex", "Financial Services",
        [("Derek", "Shaw", "VP, Integrations"), ("Elaine", "Cho", "Data Engineer")]),
    ("3", "BlueSky Retail", "bluesky", "Retail",
        [("Nora", "Kim", "E-commerce Lead"), ("Jeff", "Barker", "Ops Manager")]),
    ("4", "Copper Canyon Health", "coppercanyon", "Healthcare",
        [("Omar", "Said", "Clinical Systems Lead"), ("Grace", "Whitfield", "Security Officer")]),
    ("5", "Delta Manufacturing", "deltamfg", "Manufacturing",
        [("Hank", "Porter", "Plant IT Manager"), ("Mei", "Zhou", "Automation Engineer")]),
    ("6", "Evergreen Media", "evergreen", "Media",
        [("Sofia", "Lopez", "Digital Director"), ("Adam", "Reed", "Campaign Manager")]),
    ("7", "Falcon Logistics", "falconlogx", "Logistics",
        [("Tom", "Ibrahim", "Head of Ops"), ("Rina", "Ghosh", "Systems Analyst")]),
    ("8", "Granite Insurance", "graniteins", "Insurance",
        [("Bianca", "Hale", "Underwriting IT"), ("Sean", "Oneal", "Data Scientist")]),
    ("9", "Harbor Hospitality", "harborhost", "Hospitality",
        [("Diego", "Navarro", "Guest Tech Lead"), ("Amber", "Young", "CX Manager")]),
    ("10", "IronPeak Energy", "ironpeak", "Energy",
        [("Paula", "Garcia", "Ops Technology"), ("Noah", "Williams", "Field Systems")]),
];

/// Ten customers with two contacts each. Phone numbers follow the
/// `2xx-867-5309` / `3xx-867-5309` pattern by position.
pub fn build_customers() -> Vec<Customer> {
    CUSTOMERS
        .iter()
        .enumerate()
        .map(|(index, (id, name, domain, industry, contacts))| Customer {
            id: id.to_string(),
            name: name.to_string(),
            account_number: format!("ACCT-{}", 1001 + index),
            industry: industry.to_string(),
            website: format!("https://{}.example", domain),
            phone: format!("{}-867-5309", 201 + index),
            contacts: contacts
                .iter()
                .enumerate()
                .map(|(slot, (first, last, title))| Contact {
                    first_name: first.to_string(),
                    last_name: last.to_string(),
                    email: format!(
                        "{}.{}@{}.example",
                        first.to_lowercase(),
                        last.to_lowercase(),
                        domain
                    ),
                    title: title.to_string(),
                    phone: format!("{}-867-5309", 301 + index * 2 + slot),
                })
                .collect(),
        })
        .collect()
}

/// Campaign id for a 1-based campaign number, e.g. `CAMP007`
pub fn campaign_id(number: usize) -> String {
    format!("CAMP{:03}", number)
}

/// Five leads for each of `CAMP001`..`CAMP015`
pub fn build_campaign_leads() -> Vec<Lead> {
    (1..=CAMPAIGN_COUNT)
        .flat_map(|c| {
            let id = campaign_id(c);
            (1..=LEADS_PER_CAMPAIGN).map(move |i| Lead {
                first_name: format!("Lead{}{}", c, i),
                last_name: "User".to_string(),
                email: format!("lead{}{}+{}@example.com", c, i, id),
                campaign_id: Some(id.clone()),
                ..Default::default()
            })
        })
        .collect()
}

/// One lead row per customer contact, pointing back at the customer
pub fn build_contact_index(customers: &[Customer]) -> Vec<Lead> {
    customers
        .iter()
        .flat_map(|customer| {
            customer.contacts.iter().map(move |contact| Lead {
                first_name: contact.first_name.clone(),
                last_name: contact.last_name.clone(),
                email: contact.email.clone(),
                phone: Some(contact.phone.clone()),
                customer_id: Some(customer.id.clone()),
                ..Default::default()
            })
        })
        .collect()
}
