mod lifecycle;
mod pool;
mod properties;
