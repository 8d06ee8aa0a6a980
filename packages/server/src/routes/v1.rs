use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::registration::submit_registration))
        .nest("/registrations", registration_routes())
        .nest("/events", event_routes(config))
        .nest("/notifications", notification_routes())
}

fn registration_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::registration::register_account))
        .routes(routes!(handlers::registration::list_event_registrations))
        .routes(routes!(handlers::registration::export_event_registrations))
        .routes(routes!(handlers::registration::list_user_registrations))
        .routes(routes!(handlers::registration::set_attendance))
        .routes(routes!(handlers::registration::set_registration_status))
}

fn event_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let crud = OpenApiRouter::new()
        .routes(routes!(
            handlers::event::list_events,
            handlers::event::create_event
        ))
        .routes(routes!(
            handlers::event::get_event,
            handlers::event::update_event,
            handlers::event::delete_event
        ));

    let image = OpenApiRouter::new()
        .routes(routes!(
            handlers::event::get_event_image,
            handlers::event::upload_event_image
        ))
        .layer(handlers::event::image_upload_body_limit(
            config.storage.max_image_size,
        ));

    crud.merge(image)
}

fn notification_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::notification::list_notifications))
        .routes(routes!(handlers::notification::retry_notification))
}
