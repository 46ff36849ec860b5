pub mod feature_layer;
