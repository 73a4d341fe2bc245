pub(crate) mod proj;
