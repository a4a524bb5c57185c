use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::RwLock;

use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ListResourceTemplatesResult, ListResourcesResult,
        PaginatedRequestParams, ProtocolVersion, RawResource, RawResourceTemplate,
        ReadResourceRequestParams, ReadResourceResult, Resource, ResourceContents,
        ResourceTemplate, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use tracing::{debug, info};

use crate::desk::PricingDesk;
use crate::domain::calendar::{DateRange, parse_date, parse_month};
use crate::domain::discount::DiscountType;
use crate::domain::simulation::{PendingSimulation, Strategy};
use crate::error::CalendarError;

// ---------- Resource Store ----------

/// Rendered views exposed as MCP resources.
/// Keys are URIs like `rental://calendar/2024-06`, values are text content.
#[derive(Clone, Default)]
pub struct ResourceStore {
    entries: Arc<RwLock<HashMap<String, ResourceEntry>>>,
}

#[derive(Clone)]
struct ResourceEntry {
    name: String,
    text: String,
}

impl ResourceStore {
    async fn insert(&self, uri: impl Into<String>, name: impl Into<String>, text: String) {
        self.entries.write().await.insert(
            uri.into(),
            ResourceEntry {
                name: name.into(),
                text,
            },
        );
    }

    async fn remove(&self, uri: &str) {
        self.entries.write().await.remove(uri);
    }

    async fn get(&self, uri: &str) -> Option<ResourceEntry> {
        self.entries.read().await.get(uri).cloned()
    }

    async fn list(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(uri, entry)| (uri.clone(), entry.name.clone()))
            .collect();
        entries.sort();
        entries
    }
}

impl std::fmt::Debug for ResourceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceStore").finish()
    }
}

// ---------- Pending simulations ----------

/// At most one simulation per property waits between `pricing_simulate` and
/// `pricing_apply`.
#[derive(Clone, Default)]
struct PendingSimulations {
    by_property: Arc<RwLock<HashMap<String, PendingSimulation>>>,
}

impl PendingSimulations {
    async fn put(&self, pending: PendingSimulation) {
        let replaced = self
            .by_property
            .write()
            .await
            .insert(pending.property_id.clone(), pending);
        if let Some(old) = replaced {
            debug!(
                property_id = %old.property_id,
                month = %old.month,
                "Pending simulation replaced"
            );
        }
    }

    async fn get(&self, property_id: &str) -> Option<PendingSimulation> {
        self.by_property.read().await.get(property_id).cloned()
    }

    async fn discard(&self, property_id: &str) -> Option<PendingSimulation> {
        self.by_property.write().await.remove(property_id)
    }

    /// Drop `applied` and its resource only if it is still the pending
    /// simulation of its property. The lock is held across the resource
    /// removal so a concurrent `put` cannot lose its resource.
    async fn discard_if(&self, applied: &PendingSimulation, resources: &ResourceStore) -> bool {
        let mut by_property = self.by_property.write().await;
        if by_property.get(&applied.property_id) != Some(applied) {
            debug!(
                property_id = %applied.property_id,
                "Pending simulation changed during apply, keeping the newer one"
            );
            return false;
        }
        by_property.remove(&applied.property_id);
        resources.remove(&simulation_uri(&applied.property_id)).await;
        true
    }
}

impl std::fmt::Debug for PendingSimulations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingSimulations").finish()
    }
}

fn simulation_uri(property_id: &str) -> String {
    format!("rental://simulation/{property_id}")
}

// ---------- Tool parameter types ----------

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct MonthViewToolParams {
    /// Property ids to show, one calendar row each
    pub property_ids: Vec<String>,
    /// Month to show (YYYY-MM, or any YYYY-MM-DD inside the month)
    pub month: String,
}

/// A price as typed by the operator: a number or a numeric string.
#[derive(Debug, Clone, serde::Deserialize, schemars::JsonSchema)]
#[serde(untagged)]
pub enum PriceInput {
    Number(f64),
    Text(String),
}

impl PriceInput {
    fn as_raw(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SetPriceToolParams {
    /// Property id
    pub property_id: String,
    /// Day to price (YYYY-MM-DD, property-local)
    pub date: String,
    /// Nightly price, must be positive
    pub price: PriceInput,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct SimulateToolParams {
    /// Property to simulate
    pub property_id: Option<String>,
    /// Target month (YYYY-MM)
    pub month: String,
    /// Pricing strategy (default: balanced)
    pub strategy: Option<Strategy>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct ApplyToolParams {
    /// Property whose pending simulation should be saved
    pub property_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct DiscountRulesToolParams {
    /// Property id
    pub property_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct DiscountRuleSetToolParams {
    /// Property id
    pub property_id: String,
    /// `weekly` (7+ nights) or `monthly` (28+ nights)
    pub discount_type: DiscountType,
    /// Discount in percent, 0-100
    #[schemars(range(min = 0, max = 100))]
    pub percentage: f64,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct StayQuoteToolParams {
    /// Property id
    pub property_id: String,
    /// Check-in date (YYYY-MM-DD)
    pub check_in: String,
    /// Check-out date (YYYY-MM-DD), the turnover day, not charged
    pub check_out: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
pub struct BookingReportToolParams {
    /// Property ids to include
    pub property_ids: Vec<String>,
    /// Month to report on (YYYY-MM). Ignored when `from` and `to` are given.
    pub month: Option<String>,
    /// First day of a custom range (YYYY-MM-DD)
    pub from: Option<String>,
    /// Last day of a custom range (YYYY-MM-DD, inclusive)
    pub to: Option<String>,
}

impl BookingReportToolParams {
    fn range(&self) -> crate::error::Result<DateRange> {
        match (&self.from, &self.to, &self.month) {
            (Some(from), Some(to), _) => DateRange::new(parse_date(from)?, parse_date(to)?),
            (None, None, Some(month)) => Ok(DateRange::month_of(parse_month(month)?)),
            _ => Err(CalendarError::invalid(
                "give either `month` or both `from` and `to`",
            )),
        }
    }
}

fn failure(context: &str, e: &CalendarError) -> CallToolResult {
    let hint = match e {
        CalendarError::InvalidInput { .. } => " Nothing was saved; fix the input and retry.",
        CalendarError::PropertyNotFound { .. } => {
            " Check the property id against calendar_month_view."
        }
        CalendarError::PartialWrite { .. } => {
            " The batch was not fully confirmed. The simulation is still pending; run pricing_apply again, re-applying the same prices is safe."
        }
        CalendarError::Persistence { .. } | CalendarError::Http(_) => {
            " The store did not accept the request; no prices changed."
        }
        _ => "",
    };
    CallToolResult::error(vec![Content::text(format!("{context}: {e}.{hint}"))])
}

// ---------- MCP Server ----------

#[derive(Clone)]
pub struct RentalCalendarMcpServer {
    desk: Arc<PricingDesk>,
    tool_router: ToolRouter<Self>,
    resources: ResourceStore,
    pending: PendingSimulations,
}

#[tool_router]
impl RentalCalendarMcpServer {
    pub fn new(desk: Arc<PricingDesk>) -> Self {
        Self {
            desk,
            tool_router: Self::tool_router(),
            resources: ResourceStore::default(),
            pending: PendingSimulations::default(),
        }
    }

    /// Master calendar: one row per property, one cell per day.
    #[tool(
        name = "calendar_month_view",
        description = "Show the master calendar for a month: one row per property, one line per day. Booked days show the booking id and status; open days show the nightly price (base price, or an override marked with *). Includes occupancy and price statistics per property.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn calendar_month_view(
        &self,
        Parameters(params): Parameters<MonthViewToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let month = match parse_month(&params.month) {
            Ok(m) => m,
            Err(e) => return Ok(failure("Invalid month", &e)),
        };
        match self.desk.month_view(&params.property_ids, month).await {
            Ok(view) => {
                let text = view.to_string();
                let key = month.format("%Y-%m").to_string();
                self.resources
                    .insert(
                        format!("rental://calendar/{key}"),
                        format!("Calendar: {key}"),
                        text.clone(),
                    )
                    .await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to load the calendar", &e)),
        }
    }

    /// Set the nightly price of one open day.
    #[tool(
        name = "calendar_set_price",
        description = "Set a manual nightly price for one open (not booked) day of a property. Replaces any earlier override for that day. Discards a pending simulation for the property.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = true, open_world_hint = false)
    )]
    async fn calendar_set_price(
        &self,
        Parameters(params): Parameters<SetPriceToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let date = match parse_date(&params.date) {
            Ok(d) => d,
            Err(e) => return Ok(failure("Invalid date", &e)),
        };
        match self
            .desk
            .set_override_input(&params.property_id, date, &params.price.as_raw())
            .await
        {
            Ok(row) => {
                let mut text = format!(
                    "Saved price {:.2} for {} on {}.",
                    row.price, row.property_id, row.date
                );
                if self.pending.discard(&row.property_id).await.is_some() {
                    self.resources.remove(&simulation_uri(&row.property_id)).await;
                    info!(property_id = %row.property_id, "Pending simulation discarded after manual edit");
                    text.push_str(
                        "\nThe pending simulation for this property was discarded; run pricing_simulate again.",
                    );
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to set the price", &e)),
        }
    }

    /// Preview strategy prices for a month.
    #[tool(
        name = "pricing_simulate",
        description = "Preview smart prices for every day of a month: weekends get the strategy multiplier (conservative 1.1, balanced 1.2, aggressive 1.3), holidays get the multiplier plus a holiday boost, other days keep the base price. Nothing is saved until pricing_apply.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn pricing_simulate(
        &self,
        Parameters(params): Parameters<SimulateToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let month = match parse_month(&params.month) {
            Ok(m) => m,
            Err(e) => return Ok(failure("Invalid month", &e)),
        };
        let strategy = params.strategy.unwrap_or(Strategy::Balanced);
        match self
            .desk
            .simulate(params.property_id.as_deref(), month, strategy)
            .await
        {
            Ok(pending) => {
                let mut text = pending.to_string();
                let _ = write!(
                    text,
                    "\nReview the prices above, then call pricing_apply with property_id \"{}\" to save them.",
                    pending.property_id
                );
                let uri = simulation_uri(&pending.property_id);
                let name = format!("Simulation: {}", pending.property_title);
                // pending before resource, discard_if depends on this order
                self.pending.put(pending).await;
                self.resources.insert(uri, name, text.clone()).await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Simulation failed", &e)),
        }
    }

    /// Save the pending simulation as price overrides.
    #[tool(
        name = "pricing_apply",
        description = "Save the pending simulation of a property as price overrides in one batch. Existing overrides on the simulated days are replaced; other days are untouched. Run pricing_simulate first.",
        annotations(read_only_hint = false, destructive_hint = true, idempotent_hint = true, open_world_hint = false)
    )]
    async fn pricing_apply(
        &self,
        Parameters(params): Parameters<ApplyToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let Some(pending) = self.pending.get(&params.property_id).await else {
            return Ok(CallToolResult::error(vec![Content::text(format!(
                "No pending simulation for property '{}'. Run pricing_simulate first.",
                params.property_id
            ))]));
        };
        match self.desk.apply_simulation(&pending).await {
            Ok(written) => {
                self.pending.discard_if(&pending, &self.resources).await;
                let text = format!(
                    "Applied {written} prices for {} (ID: {}) in {} using the {} strategy.",
                    pending.property_title,
                    pending.property_id,
                    pending.month.format("%Y-%m"),
                    pending.strategy
                );
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to apply the simulation", &e)),
        }
    }

    /// Length-of-stay discount rules of a property.
    #[tool(
        name = "discount_rules",
        description = "List the length-of-stay discount rules of a property: weekly (7+ nights) and monthly (28+ nights). Monthly wins when both apply.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn discount_rules(
        &self,
        Parameters(params): Parameters<DiscountRulesToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.desk.discount_rules(&params.property_id).await {
            Ok(rules) => {
                let mut text = String::new();
                if rules.is_empty() {
                    let _ = writeln!(text, "No discount rules for {}.", params.property_id);
                } else {
                    let _ = writeln!(text, "Discount rules for {}:", params.property_id);
                    for rule in &rules {
                        let amount = if rule.is_percentage {
                            format!("{}%", rule.percentage)
                        } else {
                            format!("{:.2} off", rule.percentage)
                        };
                        let _ = writeln!(
                            text,
                            "- {} ({}+ nights): {amount}",
                            rule.discount_type,
                            rule.discount_type.min_nights()
                        );
                    }
                }
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to read discount rules", &e)),
        }
    }

    /// Create or replace one discount rule.
    #[tool(
        name = "discount_rule_set",
        description = "Create or replace the weekly or monthly discount percentage (0-100) of a property.",
        annotations(read_only_hint = false, destructive_hint = false, idempotent_hint = true, open_world_hint = false)
    )]
    async fn discount_rule_set(
        &self,
        Parameters(params): Parameters<DiscountRuleSetToolParams>,
    ) -> Result<CallToolResult, McpError> {
        match self
            .desk
            .save_discount_rule(&params.property_id, params.discount_type, params.percentage)
            .await
        {
            Ok(rule) => Ok(CallToolResult::success(vec![Content::text(format!(
                "Saved {} discount of {}% for {}.",
                rule.discount_type, rule.percentage, rule.property_id
            ))])),
            Err(e) => Ok(failure("Failed to save the discount rule", &e)),
        }
    }

    /// Price a stay night by night with the applicable discount.
    #[tool(
        name = "stay_quote",
        description = "Quote a stay: the price of every night between check-in and check-out (overrides included), the subtotal, the length-of-stay discount that applies, and the total.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn stay_quote(
        &self,
        Parameters(params): Parameters<StayQuoteToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let dates = parse_date(&params.check_in)
            .and_then(|ci| parse_date(&params.check_out).map(|co| (ci, co)));
        let (check_in, check_out) = match dates {
            Ok(d) => d,
            Err(e) => return Ok(failure("Invalid dates", &e)),
        };
        match self
            .desk
            .quote_stay(&params.property_id, check_in, check_out)
            .await
        {
            Ok(quote) => {
                let text = quote.to_string();
                self.resources
                    .insert(
                        format!("rental://quote/{}", params.property_id),
                        format!("Quote: {} {check_in} to {check_out}", params.property_id),
                        text.clone(),
                    )
                    .await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to quote the stay", &e)),
        }
    }

    /// Booking counts and revenue over a period.
    #[tool(
        name = "booking_report",
        description = "Report bookings of the selected properties over a month or date range: counts per status, booked nights and revenue. Revenue counts confirmed and completed bookings only.",
        annotations(read_only_hint = true, open_world_hint = false)
    )]
    async fn booking_report(
        &self,
        Parameters(params): Parameters<BookingReportToolParams>,
    ) -> Result<CallToolResult, McpError> {
        let range = match params.range() {
            Ok(r) => r,
            Err(e) => return Ok(failure("Invalid report period", &e)),
        };
        match self.desk.booking_report(&params.property_ids, range).await {
            Ok(report) => {
                let text = report.to_string();
                self.resources
                    .insert(
                        format!("rental://report/{}_{}", range.start, range.end),
                        format!("Booking report: {range}"),
                        text.clone(),
                    )
                    .await;
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => Ok(failure("Failed to build the report", &e)),
        }
    }
}

fn template(uri: &str, name: &str, title: &str, description: &str) -> ResourceTemplate {
    ResourceTemplate {
        annotations: None,
        raw: RawResourceTemplate {
            uri_template: uri.into(),
            name: name.into(),
            title: Some(title.into()),
            description: Some(description.into()),
            mime_type: Some("text/plain".into()),
            icons: None,
        },
    }
}

#[tool_handler]
impl ServerHandler for RentalCalendarMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_resources()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Master calendar and smart pricing for vacation-rental properties.\n\
                 \n\
                 ## Calendar\n\
                 - calendar_month_view: one row per property, booked days and nightly prices for a month\n\
                 - calendar_set_price: set a manual price on one open day\n\
                 \n\
                 ## Smart pricing\n\
                 - pricing_simulate: preview strategy prices (weekend and holiday uplift) for a month\n\
                 - pricing_apply: save the pending simulation as overrides in one batch\n\
                 \n\
                 ## Discounts and quotes\n\
                 - discount_rules: weekly (7+ nights) and monthly (28+ nights) discounts\n\
                 - discount_rule_set: create or replace a discount percentage\n\
                 - stay_quote: nightly breakdown, discount and total for a stay\n\
                 \n\
                 ## Reporting\n\
                 - booking_report: bookings per status, nights and revenue\n\
                 \n\
                 ## Notes\n\
                 - Dates are property-local calendar days (YYYY-MM-DD). Check-out day is free.\n\
                 - One simulation per property is pending at a time; a new simulation replaces it and \
                 a manual price edit discards it.\n\
                 - Rendered views are kept as resources (rental://calendar/{month}, rental://simulation/{property_id})."
                    .into(),
            ),
        }
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let entries = self.resources.list().await;
        let resources: Vec<Resource> = entries
            .into_iter()
            .map(|(uri, name)| Resource {
                annotations: None,
                raw: RawResource {
                    uri,
                    name,
                    title: None,
                    description: None,
                    mime_type: Some("text/plain".into()),
                    size: None,
                    icons: None,
                    meta: None,
                },
            })
            .collect();
        Ok(ListResourcesResult {
            resources,
            next_cursor: None,
            meta: None,
        })
    }

    async fn list_resource_templates(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourceTemplatesResult, McpError> {
        let templates = vec![
            template(
                "rental://calendar/{month}",
                "Master Calendar",
                "Master calendar for a month",
                "Last calendar rendered for the month (via calendar_month_view)",
            ),
            template(
                "rental://simulation/{property_id}",
                "Pending Simulation",
                "Simulated prices awaiting apply",
                "Pending simulation of a property (via pricing_simulate); removed once applied or discarded",
            ),
            template(
                "rental://quote/{property_id}",
                "Stay Quote",
                "Last stay quote",
                "Nightly breakdown and discount of the last quote (via stay_quote)",
            ),
            template(
                "rental://report/{from}_{to}",
                "Booking Report",
                "Booking report for a period",
                "Counts per status and revenue (via booking_report)",
            ),
        ];
        Ok(ListResourceTemplatesResult {
            resource_templates: templates,
            next_cursor: None,
            meta: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match self.resources.get(&request.uri).await {
            Some(entry) => Ok(ReadResourceResult {
                contents: vec![ResourceContents::text(entry.text, request.uri)],
            }),
            None => Err(McpError::resource_not_found(
                format!("resource not found: {}", request.uri),
                None,
            )),
        }
    }
}
