//! OpenAPI documentation for the `/api/v1` surface, served at `/docs`.

use utoipa::{
    Modify, OpenApi,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};

use crate::api;
use crate::api::handlers::{haberdashery, notifications, orders, package_history, packages, settings, users, workshops};

/// The identity header asserted by the upstream proxy.
struct IdentityHeaderAddon;

impl Modify for IdentityHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.security_schemes.insert(
                "X-Atelier-User".to_string(),
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::with_description(
                    "x-atelier-user",
                    "Email of the calling user, set by the authenticating proxy. \
                     The header name is configurable through `auth.header_name`.",
                ))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    servers(
        (url = "/api/v1", description = "Workshop management API")
    ),
    modifiers(&IdentityHeaderAddon),
    paths(
        packages::list_packages,
        packages::get_package,
        users::get_current_user,
        workshops::create_workshop,
        workshops::get_workshop,
        workshops::list_workers,
        workshops::add_worker,
        workshops::remove_worker,
        workshops::list_customers,
        workshops::create_customer,
        workshops::remove_customer,
        orders::list_orders,
        orders::create_order,
        orders::update_order,
        orders::delete_order,
        orders::create_order_group,
        orders::list_fittings,
        orders::schedule_fitting,
        settings::get_settings,
        settings::update_settings,
        settings::reapply_limits,
        settings::check_quota,
        settings::list_authorizations,
        settings::set_authorizations,
        settings::is_authorized,
        settings::grant_authorization,
        settings::revoke_authorization,
        package_history::list_history,
        package_history::get_active,
        package_history::assign_tier,
        notifications::list_notifications,
        notifications::mark_read,
        notifications::list_external,
        haberdashery::get_haberdashery,
        haberdashery::update_haberdashery,
        haberdashery::set_workers,
        haberdashery::is_member,
        haberdashery::add_worker,
        haberdashery::remove_worker,
        haberdashery::list_article_types,
        haberdashery::create_article_type,
        haberdashery::check_article_type_name,
        haberdashery::get_article_type,
        haberdashery::update_article_type,
        haberdashery::delete_article_type,
        haberdashery::check_article_name,
        haberdashery::list_articles,
        haberdashery::create_article,
        haberdashery::get_article,
        haberdashery::update_article,
        haberdashery::delete_article,
    ),
    components(schemas(
        api::models::packages::PackageResponse,
        api::models::users::CurrentUser,
        api::models::workshops::WorkshopCreate,
        api::models::workshops::WorkshopResponse,
        api::models::workers::WorkerCreate,
        api::models::workers::WorkerResponse,
        api::models::customers::CustomerCreate,
        api::models::customers::CustomerResponse,
        api::models::orders::OrderCreate,
        api::models::orders::OrderUpdate,
        api::models::orders::OrderResponse,
        api::models::orders::OrderGroupCreate,
        api::models::orders::OrderGroupResponse,
        api::models::orders::FittingCreate,
        api::models::orders::FittingResponse,
        api::models::settings::SettingResponse,
        api::models::settings::SettingUpdate,
        api::models::settings::ReapplyResponse,
        api::models::settings::QuotaResponse,
        api::models::settings::AuthorizationStatus,
        api::models::settings::AuthorizationChange,
        api::models::settings::AuthorizationSetUpdate,
        api::models::package_history::TierAssign,
        api::models::package_history::PackageHistoryResponse,
        api::models::notifications::NotificationResponse,
        api::models::notifications::ExternalNotificationResponse,
        api::models::haberdashery::HaberdasheryResponse,
        api::models::haberdashery::HaberdasheryUpdate,
        api::models::haberdashery::HaberdasheryWorkersUpdate,
        api::models::haberdashery::HaberdasheryMembership,
        api::models::haberdashery::HaberdasheryMembershipChange,
        api::models::haberdashery::ArticleTypeCreate,
        api::models::haberdashery::ArticleTypeUpdate,
        api::models::haberdashery::ArticleTypeResponse,
        api::models::haberdashery::ArticleCreate,
        api::models::haberdashery::ArticleUpdate,
        api::models::haberdashery::ArticleResponse,
        api::models::haberdashery::NameCheck,
        api::models::haberdashery::NameCheckResponse,
        crate::packages::Tier,
        crate::packages::LimitProfile,
        crate::types::Capability,
        crate::types::ResourceKind,
    )),
    tags(
        (name = "packages", description = "Subscription catalog and package history"),
        (name = "users", description = "The calling user"),
        (name = "workshops", description = "Workshop tenants"),
        (name = "workers", description = "Workshop staff"),
        (name = "customers", description = "Workshop customers"),
        (name = "orders", description = "Orders and order groups"),
        (name = "fittings", description = "Fitting appointments"),
        (name = "settings", description = "Quota ceilings and capability grants"),
        (name = "notifications", description = "Internal notifications and queued customer messages"),
        (name = "haberdashery", description = "Supplies inventory: article types, articles and the workers allowed to manage them"),
    )
)]
pub struct ApiDoc;
