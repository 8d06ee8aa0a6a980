mod approval;
mod notification;
mod registration;
