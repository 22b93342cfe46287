use crate::{
    api::{admin, attendance, task},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Per-route limiter keyed on the peer address
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let auth_limiter = Arc::new(build_limiter(config.rate_auth_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/register")
                    .wrap(auth_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/login")
                    .wrap(auth_limiter)
                    .route(web::post().to(handlers::login)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/attendance")
                    // /attendance/login
                    .service(web::resource("/login").route(web::post().to(attendance::clock_in)))
                    // /attendance/logout
                    .service(web::resource("/logout").route(web::post().to(attendance::clock_out)))
                    // /attendance/{user_id}
                    .service(
                        web::resource("/{user_id}").route(web::get().to(attendance::user_history)),
                    )
                    .service(
                        web::resource("/{user_id}/active")
                            .route(web::get().to(attendance::active_session)),
                    )
                    .service(
                        web::resource("/{user_id}/summary")
                            .route(web::get().to(attendance::daily_summary)),
                    ),
            )
            .service(
                web::scope("/tasks")
                    // /tasks
                    .service(web::resource("").route(web::post().to(task::create_task)))
                    .service(web::resource("/bulk").route(web::post().to(task::create_bulk)))
                    .service(
                        web::resource("/allocate/{intern_id}")
                            .route(web::post().to(task::allocate)),
                    )
                    .service(
                        web::resource("/intern/{intern_id}")
                            .route(web::get().to(task::intern_tasks)),
                    )
                    // /tasks/{task_id}
                    .service(
                        web::resource("/{task_id}/progress")
                            .route(web::put().to(task::update_progress)),
                    )
                    .service(
                        web::resource("/{task_id}").route(web::delete().to(task::delete_task)),
                    ),
            )
            .service(
                web::scope("/admin")
                    .service(
                        web::resource("/attendance/grouped")
                            .route(web::get().to(admin::grouped_attendance)),
                    )
                    .service(
                        web::resource("/attendance/details")
                            .route(web::get().to(admin::attendance_details)),
                    )
                    .service(
                        web::resource("/task-templates").route(web::get().to(admin::task_templates)),
                    )
                    .service(
                        web::resource("/interns-without-tasks")
                            .route(web::get().to(admin::interns_without_tasks)),
                    )
                    .service(
                        web::resource("/tasks/bulk-assign")
                            .route(web::post().to(admin::bulk_assign)),
                    )
                    .service(web::resource("/users").route(web::post().to(handlers::create_user))),
            ),
    );
}
