pub(crate) mod smoke;
