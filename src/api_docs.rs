use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::auth::login,
        api::auth::register,
        api::phones::list_phones,
        api::agreements::download_pdf,
        api::sales::export_report,
    ),
    tags(
        (name = "phonedesk", description = "Phonedesk API")
    )
)]
pub struct ApiDoc;
