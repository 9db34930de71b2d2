pub mod auth;
pub mod cors;

pub use auth::{
    jwt_auth_middleware, 
    validate_jwt_token, 
    generate_jwt_token, 
    require_role, 
    require_permission,
    rate_limit_middleware,
    security_headers_middleware,
    Claims,
    AuthConfig,
};