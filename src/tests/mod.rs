mod helper;
mod rollback;
mod validation;
