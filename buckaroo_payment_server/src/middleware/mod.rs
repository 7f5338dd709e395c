mod gateway_filter;

pub use gateway_filter::GatewayHostFilterFactory;
